//! Runtime multiple dispatch.
//!
//! A member name may be declared several times, each candidate carrying the
//! argument types it expects. Calls pick a candidate from the runtime types
//! of the arguments.
//!
//! # Module Structure
//!
//! - [`signature`] - Type signatures, exact and coercive matching
//! - [`placeholder`] - Self-referential placeholders and binding cells
//! - [`candidate`] - Candidates, implementations and the declaring decorator
//! - [`coerce`] - The coercion registry
//! - [`dispatcher`] - Call-time resolution
//! - [`binding`] - Receiver binding on attribute access
//! - [`collector`] - Two-phase collection into dispatchers
//! - [`result`] - Errors

pub mod binding;
pub mod candidate;
pub mod coerce;
pub mod collector;
pub mod dispatcher;
pub mod placeholder;
pub mod result;
pub mod signature;


pub use binding::{Binding, BoundMember};

pub use candidate::{
    fallback,
    overload,
    CallFrame,
    Candidate,
    CandidateEntry,
    CandidateMarker,
    ImplFn,
    Implementation,
    MemberKind,
    Receiver,
};

pub use coerce::{CoercionFailure, CoercionFn, CoercionRegistry};

pub use collector::{Assignment, NamespaceItem, NamespaceVisitor, SignatureCollector};

pub use dispatcher::{Dispatcher, MatchPath, Selection};

pub use placeholder::{BindingCell, Placeholder, ResolutionContext};

pub use result::{DispatchError, DispatchMismatch, DispatchResult, ResolutionError};

pub use signature::{ArgTypes, CoercedArgs, TypeSignature, TypeSlot};
