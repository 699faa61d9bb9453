//! Argument-type signatures for overload candidates.
//!
//! A [`TypeSignature`] is an ordered tuple of [`TypeSlot`]s. Slots may hold
//! [`Placeholder`]s while the owning type is under construction; resolution
//! replaces them exactly once and computes the digest used by the exact-match
//! path.

use std::fmt;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::object::{Ty, TyId, Value, WeakTy};

use super::coerce::CoercionRegistry;
use super::placeholder::{Placeholder, ResolutionContext};
use super::result::ResolutionError;

/// One expected argument type.
#[derive(Debug, Clone)]
pub enum TypeSlot {
    Concrete(Ty),
    Placeholder(Placeholder),
    /// A placeholder after resolution. Does not keep the type alive.
    Resolved(Placeholder, WeakTy),
}

impl TypeSlot {
    /// Identity of the expected type; `None` while unresolved.
    pub fn ty_id(&self) -> Option<TyId> {
        match self {
            TypeSlot::Concrete(ty) => Some(ty.id()),
            TypeSlot::Resolved(_, weak) => Some(weak.id()),
            TypeSlot::Placeholder(_) => None,
        }
    }

    /// The expected type, if it is known and still alive.
    pub fn ty(&self) -> Option<Ty> {
        match self {
            TypeSlot::Concrete(ty) => Some(ty.clone()),
            TypeSlot::Resolved(_, weak) => weak.upgrade(),
            TypeSlot::Placeholder(_) => None,
        }
    }
}

impl PartialEq for TypeSlot {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TypeSlot::Placeholder(a), TypeSlot::Placeholder(b)) => a == b,
            _ => self.ty_id().is_some() && self.ty_id() == other.ty_id(),
        }
    }
}

impl Eq for TypeSlot {}

impl Hash for TypeSlot {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            TypeSlot::Placeholder(p) => p.hash(state),
            _ => self.ty_id().hash(state),
        }
    }
}

impl From<Ty> for TypeSlot {
    fn from(ty: Ty) -> Self {
        TypeSlot::Concrete(ty)
    }
}

impl From<&Ty> for TypeSlot {
    fn from(ty: &Ty) -> Self {
        TypeSlot::Concrete(ty.clone())
    }
}

impl From<Placeholder> for TypeSlot {
    fn from(p: Placeholder) -> Self {
        TypeSlot::Placeholder(p)
    }
}

impl fmt::Display for TypeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSlot::Concrete(ty) => write!(f, "{}", ty),
            TypeSlot::Placeholder(p) => write!(f, "{}", p),
            TypeSlot::Resolved(p, weak) => match weak.upgrade() {
                Some(ty) => write!(f, "{}", ty),
                None => write!(f, "{}", p),
            },
        }
    }
}

fn digest(len: usize, ids: impl Iterator<Item = TyId>) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write_usize(len);
    for id in ids {
        id.hash(&mut hasher);
    }
    hasher.finish()
}

/// Runtime argument types of one call, with their digest computed once.
#[derive(Debug, Clone)]
pub struct ArgTypes {
    types: Vec<Ty>,
    digest: u64,
}

impl ArgTypes {
    pub fn of(args: &[Value]) -> Self {
        Self::from_types(args.iter().map(Value::type_of).collect())
    }

    pub fn from_types(types: Vec<Ty>) -> Self {
        let digest = digest(types.len(), types.iter().map(Ty::id));
        Self { types, digest }
    }

    pub fn types(&self) -> &[Ty] {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn into_types(self) -> Vec<Ty> {
        self.types
    }
}

/// Outcome of a slot-by-slot coercion attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercedArgs {
    /// Arguments that matched their slot, coerced where needed.
    pub values: Vec<Value>,
    /// Slots whose argument could not be coerced.
    pub skipped: Vec<usize>,
}

impl CoercedArgs {
    /// Every slot was typed successfully.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// An ordered tuple of expected argument types.
#[derive(Debug, Clone)]
pub struct TypeSignature {
    slots: Vec<TypeSlot>,
    /// Present exactly when the signature has been resolved.
    digest: Option<u64>,
}

impl TypeSignature {
    /// Build a signature from concrete types and/or placeholders.
    pub fn from_slots<I, S>(slots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TypeSlot>,
    {
        Self {
            slots: slots.into_iter().map(Into::into).collect(),
            digest: None,
        }
    }

    /// The zero-argument signature.
    pub fn empty() -> Self {
        Self {
            slots: Vec::new(),
            digest: None,
        }
    }

    pub fn slots(&self) -> &[TypeSlot] {
        &self.slots
    }

    pub fn arity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_resolved(&self) -> bool {
        self.digest.is_some()
    }

    /// Placeholder slots, with their positions.
    pub fn placeholders(&self) -> impl Iterator<Item = (usize, Placeholder)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| match slot {
                TypeSlot::Placeholder(p) => Some((i, *p)),
                _ => None,
            })
    }

    /// Return a copy with every placeholder replaced from `cx`.
    ///
    /// Resolving an already-resolved signature is an error, not a no-op.
    pub fn resolve(&self, cx: &ResolutionContext) -> Result<TypeSignature, ResolutionError> {
        if self.is_resolved() {
            return Err(ResolutionError::AlreadyResolved {
                signature: self.to_string(),
            });
        }

        let mut slots = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            let resolved = match slot {
                TypeSlot::Placeholder(p) => TypeSlot::Resolved(*p, cx.lookup(*p)?.downgrade()),
                other => other.clone(),
            };
            slots.push(resolved);
        }

        let digest = digest(slots.len(), slots.iter().filter_map(TypeSlot::ty_id));
        Ok(TypeSignature {
            slots,
            digest: Some(digest),
        })
    }

    /// Exact match: every argument type is identical to its slot.
    ///
    /// Unresolved signatures never match.
    pub fn fast_match(&self, args: &ArgTypes) -> bool {
        match self.digest {
            Some(d) if d == args.digest => {
                self.slots.len() == args.types.len()
                    && self
                        .slots
                        .iter()
                        .zip(&args.types)
                        .all(|(slot, ty)| slot.ty_id() == Some(ty.id()))
            }
            _ => false,
        }
    }

    /// Coercive match: keep each argument that already has its slot's type,
    /// otherwise try the registry's coercion for that slot.
    ///
    /// A failed slot is skipped, not fatal. Returns `None` when the argument
    /// count differs from the arity.
    pub fn coerce_match(&self, args: &[Value], registry: &CoercionRegistry) -> Option<CoercedArgs> {
        if args.len() != self.slots.len() {
            return None;
        }

        let mut out = CoercedArgs {
            values: Vec::with_capacity(args.len()),
            skipped: Vec::new(),
        };

        for (i, (slot, arg)) in self.slots.iter().zip(args).enumerate() {
            let Some(target) = slot.ty() else {
                out.skipped.push(i);
                continue;
            };
            if arg.type_of() == target {
                out.values.push(arg.clone());
                continue;
            }
            match registry.coerce(arg, &target) {
                Ok(value) => out.values.push(value),
                Err(_) => out.skipped.push(i),
            }
        }

        Some(out)
    }
}

impl PartialEq for TypeSignature {
    fn eq(&self, other: &Self) -> bool {
        self.slots == other.slots
    }
}

impl Eq for TypeSignature {}

impl Hash for TypeSignature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slots.hash(state);
    }
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, slot) in self.slots.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", slot)?;
        }
        write!(f, ")")
    }
}
