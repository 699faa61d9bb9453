//! Two-phase type construction.
//!
//! A [`TypeBuilder`] accumulates the body of a type: plain attributes and
//! overload candidates. [`TypeBuilder::finish`] creates the type object,
//! writes it into the placeholder binding cells, and installs the namespace
//! with one [`Dispatcher`](crate::dispatch::Dispatcher) per overloaded name.
//!
//! ```
//! use multidispatch::{overload, DispatchResult, Placeholder, Ty, TypeBuilder, Value};
//!
//! # fn main() -> DispatchResult<()> {
//! let mut builder = TypeBuilder::new("Vec2");
//! builder.candidate("scale", overload([Ty::float()]).wrap(|frame| Ok(Value::float(frame.float(0)?))))?;
//! builder.candidate("scale", overload([Placeholder::SelfType]).wrap(|_| Ok(Value::str("each"))))?;
//! let vec2 = builder.finish()?;
//!
//! let v = vec2.instantiate();
//! assert_eq!(v.call_method("scale", &[Value::Int(2)])?, Value::float(2.0));
//! assert_eq!(v.call_method("scale", &[vec2.instantiate()])?, Value::str("each"));
//! # Ok(())
//! # }
//! ```

use tracing::debug;

use crate::config::DispatchContext;
use crate::dispatch::{
    Assignment,
    Candidate,
    DispatchError,
    DispatchResult,
    NamespaceItem,
    NamespaceVisitor,
    Placeholder,
    ResolutionContext,
    SignatureCollector,
};
use crate::object::{Member, Namespace, Ty, Value};

/// Builds one type.
#[derive(Debug)]
pub struct TypeBuilder {
    name: String,
    bases: Vec<Ty>,
    namespace: Namespace,
    collector: SignatureCollector,
    bindings: ResolutionContext,
}

impl TypeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_context(name, &DispatchContext::default())
    }

    pub fn with_context(name: impl Into<String>, cx: &DispatchContext) -> Self {
        let name = name.into();
        Self {
            collector: SignatureCollector::new(name.clone(), cx.clone()),
            name,
            bases: Vec::new(),
            namespace: Namespace::new(),
            bindings: ResolutionContext::empty(),
        }
    }

    /// Add a base type. Bases are searched in the order they are added.
    pub fn base(mut self, base: Ty) -> Self {
        self.bases.push(base);
        self
    }

    /// Resolve `OwnerType` to `owner` instead of the type being built.
    pub fn owner(self, owner: Ty) -> DispatchResult<Self> {
        self.bindings.bind(Placeholder::OwnerType, owner)?;
        Ok(self)
    }

    /// Attach the registering descriptor, enabling `DescriptorInstance`.
    pub fn descriptor(mut self, descriptor: Ty) -> DispatchResult<Self> {
        self.bindings.bind(Placeholder::DescriptorInstance, descriptor)?;
        self.collector.accept_descriptor();
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Assign a plain attribute.
    pub fn define(&mut self, name: &str, value: Value) -> DispatchResult<&mut Self> {
        self.assign(name, NamespaceItem::Value(value))
    }

    /// Declare an overload candidate.
    pub fn candidate(&mut self, name: &str, candidate: Candidate) -> DispatchResult<&mut Self> {
        self.assign(name, NamespaceItem::Candidate(candidate))
    }

    fn assign(&mut self, name: &str, item: NamespaceItem) -> DispatchResult<&mut Self> {
        let previous = self.namespace.get(name);
        match self.collector.on_assign(name, item, previous)? {
            Assignment::Store(value) => {
                self.namespace.insert(name.to_string(), Member::Value(value));
            }
            Assignment::Consumed => {}
        }
        Ok(self)
    }

    /// Create the type and install its final namespace.
    pub fn finish(mut self) -> DispatchResult<Ty> {
        let ty = Ty::declare(self.name, self.bases);

        self.bindings.bind(Placeholder::SelfType, ty.clone())?;
        if !self.bindings.cell(Placeholder::OwnerType).is_bound() {
            self.bindings.bind(Placeholder::OwnerType, ty.clone())?;
        }

        let namespace = self.collector.on_finish(self.namespace, &self.bindings)?;
        let members = namespace.len();
        if !ty.install_namespace(namespace) {
            return Err(DispatchError::AlreadyFinalized {
                type_name: ty.name().to_string(),
            });
        }

        debug!(type_name = %ty, id = ty.id().index(), members, "finished type");
        Ok(ty)
    }
}
