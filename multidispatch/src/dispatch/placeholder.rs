//! Self-referential type placeholders and their write-once bindings.

use std::fmt;
use std::sync::OnceLock;

use crate::object::Ty;

use super::result::ResolutionError;

/// A marker for a type that does not exist yet when a candidate is declared.
///
/// Placeholders carry identity only. They are replaced by concrete types
/// exactly once, when the owning type is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// The type whose body is being built.
    SelfType,
    /// The type the member ultimately lives on. Defaults to the type being
    /// built; differs when a builder declares members on behalf of another type.
    OwnerType,
    /// The registering descriptor, for candidates attached to a descriptor.
    DescriptorInstance,
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Placeholder::SelfType => "Self",
            Placeholder::OwnerType => "Owner",
            Placeholder::DescriptorInstance => "Descriptor",
        };
        f.write_str(name)
    }
}

/// A one-shot slot that receives the concrete type for one placeholder.
#[derive(Debug)]
pub struct BindingCell {
    placeholder: Placeholder,
    slot: OnceLock<Ty>,
}

impl BindingCell {
    pub fn new(placeholder: Placeholder) -> Self {
        Self {
            placeholder,
            slot: OnceLock::new(),
        }
    }

    fn bound(placeholder: Placeholder, ty: Ty) -> Self {
        Self {
            placeholder,
            slot: OnceLock::from(ty),
        }
    }

    pub fn placeholder(&self) -> Placeholder {
        self.placeholder
    }

    /// Write the concrete type. A second write is rejected.
    pub fn bind(&self, ty: Ty) -> Result<(), ResolutionError> {
        self.slot
            .set(ty)
            .map_err(|_| ResolutionError::AlreadyBound(self.placeholder))
    }

    pub fn get(&self) -> Option<&Ty> {
        self.slot.get()
    }

    pub fn is_bound(&self) -> bool {
        self.slot.get().is_some()
    }
}

/// The concrete types placeholders resolve to for one finished type.
#[derive(Debug)]
pub struct ResolutionContext {
    owner: BindingCell,
    self_ty: BindingCell,
    descriptor: BindingCell,
}

impl ResolutionContext {
    /// A context with every cell still empty.
    pub fn empty() -> Self {
        Self {
            owner: BindingCell::new(Placeholder::OwnerType),
            self_ty: BindingCell::new(Placeholder::SelfType),
            descriptor: BindingCell::new(Placeholder::DescriptorInstance),
        }
    }

    /// A fully bound context.
    pub fn new(owner: Ty, self_ty: Ty, descriptor: Option<Ty>) -> Self {
        Self {
            owner: BindingCell::bound(Placeholder::OwnerType, owner),
            self_ty: BindingCell::bound(Placeholder::SelfType, self_ty),
            descriptor: match descriptor {
                Some(ty) => BindingCell::bound(Placeholder::DescriptorInstance, ty),
                None => BindingCell::new(Placeholder::DescriptorInstance),
            },
        }
    }

    /// Context for a plain type: owner and self are the same type.
    pub fn for_type(ty: &Ty) -> Self {
        Self::new(ty.clone(), ty.clone(), None)
    }

    pub fn cell(&self, placeholder: Placeholder) -> &BindingCell {
        match placeholder {
            Placeholder::OwnerType => &self.owner,
            Placeholder::SelfType => &self.self_ty,
            Placeholder::DescriptorInstance => &self.descriptor,
        }
    }

    pub fn bind(&self, placeholder: Placeholder, ty: Ty) -> Result<(), ResolutionError> {
        self.cell(placeholder).bind(ty)
    }

    /// The concrete type for `placeholder`, or `Unbound` if its cell is empty.
    pub fn lookup(&self, placeholder: Placeholder) -> Result<&Ty, ResolutionError> {
        self.cell(placeholder)
            .get()
            .ok_or(ResolutionError::Unbound(placeholder))
    }
}

impl Default for ResolutionContext {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_binds_once() {
        let cell = BindingCell::new(Placeholder::SelfType);
        assert!(!cell.is_bound());
        cell.bind(Ty::int()).unwrap();
        assert_eq!(cell.get(), Some(&Ty::int()));
        assert_eq!(
            cell.bind(Ty::float()),
            Err(ResolutionError::AlreadyBound(Placeholder::SelfType))
        );
        assert_eq!(cell.get(), Some(&Ty::int()));
    }

    #[test]
    fn test_context_lookup() {
        let cx = ResolutionContext::new(Ty::int(), Ty::float(), None);
        assert_eq!(cx.lookup(Placeholder::OwnerType), Ok(&Ty::int()));
        assert_eq!(cx.lookup(Placeholder::SelfType), Ok(&Ty::float()));
        assert_eq!(
            cx.lookup(Placeholder::DescriptorInstance),
            Err(ResolutionError::Unbound(Placeholder::DescriptorInstance))
        );
    }

    #[test]
    fn test_placeholder_display() {
        assert_eq!(Placeholder::SelfType.to_string(), "Self");
        assert_eq!(Placeholder::OwnerType.to_string(), "Owner");
        assert_eq!(Placeholder::DescriptorInstance.to_string(), "Descriptor");
    }
}
