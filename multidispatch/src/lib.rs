//! Runtime multiple dispatch over declared argument-type signatures.
//!
//! A member name can be declared several times on a type, each candidate
//! annotated with the tuple of argument types it expects. At call time the
//! runtime types of the arguments select the candidate:
//!
//! 1. an exact type match, in declaration order;
//! 2. otherwise the first candidate every argument can be coerced into;
//! 3. otherwise the unconstrained fallback, if one was declared;
//! 4. otherwise a [`DispatchMismatch`] listing everything that was tried.
//!
//! Types are built in two phases. A [`TypeBuilder`] collects candidates while
//! the type body is assembled; signatures may name the type under
//! construction through [`Placeholder`]s. `finish()` creates the type,
//! resolves every placeholder once, and installs one immutable
//! [`Dispatcher`] per overloaded name.
//!
//! # Example
//!
//! ```
//! use multidispatch::{fallback, overload, DispatchResult, Ty, TypeBuilder, Value};
//!
//! # fn main() -> DispatchResult<()> {
//! let mut builder = TypeBuilder::new("Math");
//! builder.candidate("f", overload([Ty::int(), Ty::int()]).static_member().wrap(|_| Ok(Value::str("a"))))?;
//! builder.candidate("f", overload([Ty::float(), Ty::float()]).static_member().wrap(|_| Ok(Value::str("b"))))?;
//! builder.candidate("f", fallback().static_member().wrap(|_| Ok(Value::str("any"))))?;
//! let math = builder.finish()?;
//!
//! assert_eq!(math.call_method("f", &[Value::Int(3), Value::Int(4)])?, Value::str("a"));
//! assert_eq!(math.call_method("f", &[Value::Int(3), Value::float(4.0)])?, Value::str("b"));
//! assert_eq!(math.call_method("f", &[Value::str("x")])?, Value::str("any"));
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod dispatch;
pub mod object;

pub use builder::TypeBuilder;
pub use config::{ConfigError, DispatchConfig, DispatchContext};
pub use dispatch::{
    fallback,
    overload,
    Binding,
    BoundMember,
    CallFrame,
    Candidate,
    CoercionRegistry,
    DispatchError,
    DispatchMismatch,
    DispatchResult,
    Dispatcher,
    MatchPath,
    MemberKind,
    Placeholder,
    Receiver,
    ResolutionError,
    TypeSignature,
    TypeSlot,
};
pub use object::{Attribute, Instance, Member, Namespace, Ty, TyId, Value, WeakTy};
