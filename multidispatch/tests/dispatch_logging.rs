//! Warnings emitted while building types and coercion tables.

use std::io;
use std::sync::{Arc, Mutex};

use multidispatch::{overload, CoercionRegistry, DispatchConfig, DispatchContext, Ty, TypeBuilder, Value};
use pretty_assertions::assert_eq;
use tracing_subscriber::EnvFilter;

/// Collects formatted log output in memory.
#[derive(Clone, Default)]
struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    /// Run `f` with WARN and above written into this capture.
    fn run(&self, f: impl FnOnce()) {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("warn"))
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .without_time()
            .finish();
        tracing::subscriber::with_default(subscriber, f);
    }

    fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8_lossy(&bytes).lines().map(str::to_string).collect()
    }

    fn warnings(&self, message: &str) -> usize {
        self.lines()
            .iter()
            .filter(|line| line.contains("WARN") && line.contains(message))
            .count()
    }
}

#[test]
fn test_coercion_overwrite_warns_when_enabled() {
    let capture = LogCapture::default();
    capture.run(|| {
        let mut loud = CoercionRegistry::new();
        loud.register(Ty::int(), |_| None);
        loud.register(Ty::int(), |_| None);

        let mut quiet = CoercionRegistry::new().with_overwrite_logging(false);
        quiet.register(Ty::int(), |_| None);
        quiet.register(Ty::int(), |_| None);
    });

    assert_eq!(capture.lines().len(), 1);
    assert_eq!(capture.warnings("coercion re-registered"), 1);
    assert!(capture.lines()[0].contains("target_type=int"));
}

#[test]
fn test_log_overwrites_config_reaches_context_registry() {
    let capture = LogCapture::default();
    capture.run(|| {
        let config = DispatchConfig::from_toml_str("log_overwrites = false").unwrap();
        let mut quiet = DispatchContext::from_config(config);
        quiet.register_coercion(Ty::float(), |_| None);

        let mut loud = DispatchContext::default();
        loud.register_coercion(Ty::float(), |_| None);
    });

    assert_eq!(capture.lines().len(), 1);
    assert_eq!(capture.warnings("coercion re-registered"), 1);
}

#[test]
fn test_plain_assignment_over_candidates_warns() {
    let capture = LogCapture::default();
    capture.run(|| {
        let mut b = TypeBuilder::new("Shadowed");
        b.candidate("f", overload([Ty::int()]).wrap(|_| Ok(Value::None)))
            .unwrap();
        b.define("f", Value::Int(1)).unwrap();
        // Nothing to shadow the second time.
        b.define("f", Value::Int(2)).unwrap();
        b.finish().unwrap();
    });

    assert_eq!(capture.lines().len(), 1);
    assert_eq!(capture.warnings("plain assignment shadows overload candidates"), 1);
    assert!(capture.lines()[0].contains("member=\"f\""));
}
