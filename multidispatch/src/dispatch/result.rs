//! Dispatch errors.

use std::fmt;

use thiserror::Error;

use crate::object::Ty;

use super::candidate::MemberKind;
use super::placeholder::Placeholder;
use super::signature::TypeSignature;

/// Errors raised while declaring, finishing, or calling overloaded members.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Mismatch(#[from] DispatchMismatch),

    #[error("duplicate fallback for `{member}`: candidate #{index} is a second unconstrained candidate")]
    DuplicateFallback { member: String, index: usize },

    #[error("malformed signature for `{member}`: {reason}")]
    MalformedSignature { member: String, reason: String },

    #[error("candidates for `{member}` mix binding modes: {first} and {second}")]
    MixedBindingModes {
        member: String,
        first: MemberKind,
        second: MemberKind,
    },

    #[error("unresolved placeholder `{placeholder}` in slot {slot} of a signature for `{member}`")]
    UnresolvedPlaceholder {
        member: String,
        slot: usize,
        placeholder: Placeholder,
    },

    #[error("placeholder resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("signature collection for `{type_name}` was already finalized")]
    AlreadyFinalized { type_name: String },

    #[error("`{member}` was read through its type and needs the receiver as first argument")]
    MissingReceiver { member: String },

    #[error("type `{type_name}` has no attribute `{name}`")]
    AttributeMissing { type_name: String, name: String },

    #[error("attribute `{name}` of `{type_name}` is not callable")]
    NotCallable { type_name: String, name: String },

    #[error("`{member}` failed: {message}")]
    Implementation { member: String, message: String },
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Errors from replacing placeholders with concrete types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("signature {signature} is already resolved")]
    AlreadyResolved { signature: String },

    #[error("signature {signature} was never resolved")]
    NotResolved { signature: String },

    #[error("placeholder `{0}` has no binding")]
    Unbound(Placeholder),

    #[error("binding for `{0}` was already written")]
    AlreadyBound(Placeholder),
}

/// No candidate accepted the supplied arguments and there is no fallback.
///
/// Carries the received argument types and every signature that was tried,
/// in declaration order.
#[derive(Debug, Clone)]
pub struct DispatchMismatch {
    /// The overloaded member that was called.
    pub member: String,
    /// Runtime types of the supplied arguments.
    pub arg_types: Vec<Ty>,
    /// Every candidate signature, in declaration order.
    pub signatures: Vec<TypeSignature>,
}

impl DispatchMismatch {
    /// True when no candidate even takes this many arguments.
    pub fn is_arity_mismatch(&self) -> bool {
        self.signatures
            .iter()
            .all(|sig| sig.arity() != self.arg_types.len())
    }
}

impl fmt::Display for DispatchMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no candidate of `{}` accepts (", self.member)?;
        for (i, ty) in self.arg_types.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", ty)?;
        }
        write!(f, ")")?;

        if self.is_arity_mismatch() {
            let n = self.arg_types.len();
            let noun = if n == 1 { "argument" } else { "arguments" };
            write!(f, "\nnote: no candidate takes {} {}", n, noun)?;
        }
        // Only raised when the member has no fallback.
        write!(f, "\nnote: `{}` declares no fallback", self.member)?;

        write!(f, "\ncandidates tried, in declaration order:")?;
        if self.signatures.is_empty() {
            write!(f, "\n  (none)")?;
        }
        for (i, sig) in self.signatures.iter().enumerate() {
            write!(f, "\n  {}: {}", i, sig)?;
        }

        Ok(())
    }
}

impl std::error::Error for DispatchMismatch {}
