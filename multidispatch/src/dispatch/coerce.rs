//! The coercion table used by the coercive resolution path.

use std::fmt;
use std::sync::{Arc, OnceLock};

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::warn;

use crate::object::{Ty, Value};

/// A coercion function: the converted value, or `None` if it does not apply.
pub type CoercionFn = dyn Fn(&Value) -> Option<Value> + Send + Sync;

/// A value could not be coerced to a target type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot coerce {found} to {target}")]
pub struct CoercionFailure {
    pub found: Ty,
    pub target: Ty,
}

/// Maps a target type to the function that converts values into it.
///
/// Populated at startup, then shared read-only behind an `Arc`.
#[derive(Clone)]
pub struct CoercionRegistry {
    table: FxHashMap<Ty, Arc<CoercionFn>>,
    log_overwrites: bool,
}

impl CoercionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            table: FxHashMap::default(),
            log_overwrites: true,
        }
    }

    /// The default widening table.
    ///
    /// `float` accepts `int` and `bool`, `int` accepts `bool`, and `str`
    /// accepts any of the three. There is no narrowing from `float` to `int`.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Ty::float(), |value| match value {
            Value::Int(n) => Some(Value::float(*n as f64)),
            Value::Bool(b) => Some(Value::float(if *b { 1.0 } else { 0.0 })),
            _ => None,
        });
        registry.register(Ty::int(), |value| match value {
            Value::Bool(b) => Some(Value::Int(i64::from(*b))),
            _ => None,
        });
        registry.register(Ty::str(), |value| match value {
            Value::Int(_) | Value::Float(_) | Value::Bool(_) => Some(Value::from(value.to_string())),
            _ => None,
        });
        registry
    }

    /// Enable or disable the warning logged when a coercion is replaced.
    pub fn with_overwrite_logging(mut self, enabled: bool) -> Self {
        self.log_overwrites = enabled;
        self
    }

    /// Whether replacing a coercion logs a warning.
    pub fn log_overwrites(&self) -> bool {
        self.log_overwrites
    }

    /// Register the coercion for `target`, returning the one it replaces.
    pub fn register<F>(&mut self, target: Ty, coercion: F) -> Option<Arc<CoercionFn>>
    where
        F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    {
        let previous = self.table.insert(target.clone(), Arc::new(coercion));
        if previous.is_some() && self.log_overwrites {
            warn!(target_type = %target, "coercion re-registered; previous function replaced");
        }
        previous
    }

    /// Convert `value` to `target`. Never panics.
    pub fn coerce(&self, value: &Value, target: &Ty) -> Result<Value, CoercionFailure> {
        let found = value.type_of();
        if &found == target {
            return Ok(value.clone());
        }

        self.table
            .get(target)
            .and_then(|coercion| coercion(value))
            .filter(|coerced| &coerced.type_of() == target)
            .ok_or_else(|| CoercionFailure {
                found,
                target: target.clone(),
            })
    }

    pub fn contains(&self, target: &Ty) -> bool {
        self.table.contains_key(target)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// The process-wide registry. Defaults to [`CoercionRegistry::builtin`].
    pub fn global() -> Arc<CoercionRegistry> {
        global_cell()
            .get_or_init(|| Arc::new(CoercionRegistry::builtin()))
            .clone()
    }

    /// Install the process-wide registry. Only the first install (or first
    /// read of [`CoercionRegistry::global`]) wins; later ones get their
    /// registry back.
    pub fn install_global(registry: CoercionRegistry) -> Result<(), Arc<CoercionRegistry>> {
        global_cell().set(Arc::new(registry))
    }
}

fn global_cell() -> &'static OnceLock<Arc<CoercionRegistry>> {
    static GLOBAL: OnceLock<Arc<CoercionRegistry>> = OnceLock::new();
    &GLOBAL
}

impl Default for CoercionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CoercionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut targets: Vec<_> = self.table.keys().map(Ty::name).collect();
        targets.sort_unstable();
        f.debug_struct("CoercionRegistry")
            .field("targets", &targets)
            .field("log_overwrites", &self.log_overwrites)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_widening() {
        let registry = CoercionRegistry::builtin();
        assert_eq!(registry.coerce(&Value::Int(3), &Ty::float()), Ok(Value::float(3.0)));
        assert_eq!(registry.coerce(&Value::Bool(true), &Ty::int()), Ok(Value::Int(1)));
        assert_eq!(registry.coerce(&Value::Int(7), &Ty::str()), Ok(Value::str("7")));
        assert_eq!(registry.coerce(&Value::float(2.5), &Ty::str()), Ok(Value::str("2.5")));
    }

    #[test]
    fn test_no_narrowing() {
        let registry = CoercionRegistry::builtin();
        assert_eq!(
            registry.coerce(&Value::float(4.0), &Ty::int()),
            Err(CoercionFailure {
                found: Ty::float(),
                target: Ty::int()
            })
        );
        assert!(registry.coerce(&Value::str("3"), &Ty::int()).is_err());
    }

    #[test]
    fn test_exact_type_passes_through() {
        let registry = CoercionRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.coerce(&Value::Int(5), &Ty::int()), Ok(Value::Int(5)));
    }

    #[test]
    fn test_missing_target_fails() {
        let registry = CoercionRegistry::new();
        let err = registry.coerce(&Value::Int(5), &Ty::float()).unwrap_err();
        assert_eq!(err.to_string(), "cannot coerce int to float");
    }

    #[test]
    fn test_reregistration_overwrites() {
        let mut registry = CoercionRegistry::new().with_overwrite_logging(false);
        assert!(registry.register(Ty::int(), |_| Some(Value::Int(1))).is_none());
        assert!(registry.register(Ty::int(), |_| Some(Value::Int(2))).is_some());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.coerce(&Value::None, &Ty::int()), Ok(Value::Int(2)));
    }

    #[test]
    fn test_coercion_returning_wrong_type_fails() {
        let mut registry = CoercionRegistry::new();
        registry.register(Ty::int(), |_| Some(Value::str("not an int")));
        assert!(registry.coerce(&Value::None, &Ty::int()).is_err());
    }

    #[test]
    fn test_global_defaults_to_builtin() {
        let global = CoercionRegistry::global();
        assert!(global.contains(&Ty::float()));
        assert!(Arc::ptr_eq(&global, &CoercionRegistry::global()));
        assert!(CoercionRegistry::install_global(CoercionRegistry::new()).is_err());
    }
}
