//! Overload candidates and the decorator that declares them.
//!
//! ```
//! use multidispatch::{fallback, overload, Ty, Value};
//!
//! let add_ints = overload([Ty::int(), Ty::int()]).wrap(|frame| {
//!     Ok(Value::Int(frame.int(0)? + frame.int(1)?))
//! });
//! let anything = fallback().wrap(|_| Ok(Value::str("fallback")));
//!
//! assert_eq!(add_ints.signature().map(|sig| sig.to_string()).as_deref(), Some("(int, int)"));
//! assert!(anything.is_fallback());
//! ```

use std::fmt;
use std::sync::Arc;

use crate::object::{Ty, Value};

use super::result::{DispatchError, DispatchResult};
use super::signature::{TypeSignature, TypeSlot};

/// The callable behind one candidate.
pub type ImplFn = dyn Fn(&CallFrame<'_>) -> DispatchResult<Value> + Send + Sync;

/// The receiver injected ahead of the positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receiver {
    /// The instance an instance member was called on.
    Instance(Value),
    /// The type a class member was accessed through.
    Class(Ty),
}

impl Receiver {
    pub fn as_instance(&self) -> Option<&Value> {
        match self {
            Receiver::Instance(value) => Some(value),
            Receiver::Class(_) => None,
        }
    }

    pub fn as_class(&self) -> Option<&Ty> {
        match self {
            Receiver::Class(ty) => Some(ty),
            Receiver::Instance(_) => None,
        }
    }

    /// The instance's type, or the class itself.
    pub fn ty(&self) -> Ty {
        match self {
            Receiver::Instance(value) => value.type_of(),
            Receiver::Class(ty) => ty.clone(),
        }
    }
}

/// What an implementation sees when it is invoked.
#[derive(Debug, Clone, Copy)]
pub struct CallFrame<'a> {
    member: &'a str,
    receiver: Option<&'a Receiver>,
    args: &'a [Value],
}

impl<'a> CallFrame<'a> {
    pub fn new(member: &'a str, receiver: Option<&'a Receiver>, args: &'a [Value]) -> Self {
        Self {
            member,
            receiver,
            args,
        }
    }

    /// Name of the member being called.
    pub fn member(&self) -> &'a str {
        self.member
    }

    /// The injected receiver; `None` for static members.
    pub fn receiver(&self) -> Option<&'a Receiver> {
        self.receiver
    }

    pub fn args(&self) -> &'a [Value] {
        self.args
    }

    pub fn arg(&self, index: usize) -> DispatchResult<&'a Value> {
        self.args
            .get(index)
            .ok_or_else(|| self.fail(format!("missing argument {}", index)))
    }

    pub fn int(&self, index: usize) -> DispatchResult<i64> {
        let arg = self.arg(index)?;
        arg.as_int()
            .ok_or_else(|| self.fail(format!("argument {} is {}, expected int", index, arg.type_of())))
    }

    pub fn float(&self, index: usize) -> DispatchResult<f64> {
        let arg = self.arg(index)?;
        arg.as_float()
            .ok_or_else(|| self.fail(format!("argument {} is {}, expected float", index, arg.type_of())))
    }

    /// An implementation-level failure attributed to this member.
    pub fn fail(&self, message: impl Into<String>) -> DispatchError {
        DispatchError::Implementation {
            member: self.member.to_string(),
            message: message.into(),
        }
    }
}

/// A shared handle to an implementation callable.
#[derive(Clone)]
pub struct Implementation(Arc<ImplFn>);

impl Implementation {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&CallFrame<'_>) -> DispatchResult<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn invoke(&self, frame: &CallFrame<'_>) -> DispatchResult<Value> {
        (self.0)(frame)
    }
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Implementation(..)")
    }
}

/// How an overloaded member binds its receiver on attribute access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MemberKind {
    /// Receives the instance it was read through.
    #[default]
    Instance,
    /// Receives the type it was read through.
    Class,
    /// Receives nothing.
    Static,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MemberKind::Instance => "instance",
            MemberKind::Class => "class",
            MemberKind::Static => "static",
        };
        f.write_str(name)
    }
}

/// A declared but not yet collected implementation.
#[derive(Debug, Clone)]
pub struct Candidate {
    signature: Option<TypeSignature>,
    implementation: Implementation,
    kind: MemberKind,
}

impl Candidate {
    /// `None` for a fallback.
    pub fn signature(&self) -> Option<&TypeSignature> {
        self.signature.as_ref()
    }

    pub fn implementation(&self) -> &Implementation {
        &self.implementation
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    pub fn is_fallback(&self) -> bool {
        self.signature.is_none()
    }

    pub(crate) fn into_parts(self) -> (Option<TypeSignature>, Implementation) {
        (self.signature, self.implementation)
    }
}

/// Marks an implementation with its signature; see [`overload`] and [`fallback`].
#[derive(Debug, Clone)]
#[must_use]
pub struct CandidateMarker {
    signature: Option<TypeSignature>,
    kind: MemberKind,
}

impl CandidateMarker {
    /// Bind the receiver as the accessing type.
    pub fn class_member(mut self) -> Self {
        self.kind = MemberKind::Class;
        self
    }

    /// Bind no receiver.
    pub fn static_member(mut self) -> Self {
        self.kind = MemberKind::Static;
        self
    }

    pub fn wrap<F>(self, f: F) -> Candidate
    where
        F: Fn(&CallFrame<'_>) -> DispatchResult<Value> + Send + Sync + 'static,
    {
        self.wrap_implementation(Implementation::new(f))
    }

    pub fn wrap_implementation(self, implementation: Implementation) -> Candidate {
        Candidate {
            signature: self.signature,
            implementation,
            kind: self.kind,
        }
    }
}

/// Declare a candidate expecting the given argument types.
pub fn overload<I, S>(slots: I) -> CandidateMarker
where
    I: IntoIterator<Item = S>,
    S: Into<TypeSlot>,
{
    CandidateMarker {
        signature: Some(TypeSignature::from_slots(slots)),
        kind: MemberKind::Instance,
    }
}

/// Declare the unconstrained candidate used when nothing else matches.
pub fn fallback() -> CandidateMarker {
    CandidateMarker {
        signature: None,
        kind: MemberKind::Instance,
    }
}

/// A collected candidate inside a dispatcher.
#[derive(Debug, Clone)]
pub struct CandidateEntry {
    signature: Option<TypeSignature>,
    implementation: Implementation,
    index: usize,
}

impl CandidateEntry {
    pub(crate) fn new(
        signature: Option<TypeSignature>,
        implementation: Implementation,
        index: usize,
    ) -> Self {
        Self {
            signature,
            implementation,
            index,
        }
    }

    /// `None` for the fallback entry.
    pub fn signature(&self) -> Option<&TypeSignature> {
        self.signature.as_ref()
    }

    pub fn implementation(&self) -> &Implementation {
        &self.implementation
    }

    /// Position among all candidates declared for the same name.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_fallback(&self) -> bool {
        self.signature.is_none()
    }
}

impl fmt::Display for CandidateEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.signature {
            Some(sig) => write!(f, "{}", sig),
            None => f.write_str("(*)"),
        }
    }
}
