//! Receiver binding on attribute access.
//!
//! Reading an overloaded member produces a [`BoundMember`]. The binding lives
//! only as long as the call expression; the shared [`Dispatcher`] is never
//! modified.

use std::sync::Arc;

use crate::object::{Ty, Value};

use super::candidate::{MemberKind, Receiver};
use super::dispatcher::Dispatcher;
use super::result::{DispatchError, DispatchResult};

/// Binding state of a member read for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// An instance member read through a type: the first argument is the receiver.
    Unbound,
    /// Bound to the instance it was read through.
    Instance(Value),
    /// Bound to the type it was read through.
    Class(Ty),
    /// No receiver.
    Static,
}

/// A dispatcher paired with its transient binding.
#[derive(Debug, Clone)]
pub struct BoundMember {
    dispatcher: Arc<Dispatcher>,
    binding: Binding,
}

impl BoundMember {
    pub fn new(dispatcher: Arc<Dispatcher>, binding: Binding) -> Self {
        Self {
            dispatcher,
            binding,
        }
    }

    /// Bind for access through an instance.
    pub fn for_instance(dispatcher: Arc<Dispatcher>, receiver: Value) -> Self {
        let binding = match dispatcher.binding() {
            MemberKind::Instance => Binding::Instance(receiver),
            MemberKind::Class => Binding::Class(receiver.type_of()),
            MemberKind::Static => Binding::Static,
        };
        Self::new(dispatcher, binding)
    }

    /// Bind for access through a type.
    pub fn for_class(dispatcher: Arc<Dispatcher>, ty: Ty) -> Self {
        let binding = match dispatcher.binding() {
            MemberKind::Instance => Binding::Unbound,
            MemberKind::Class => Binding::Class(ty),
            MemberKind::Static => Binding::Static,
        };
        Self::new(dispatcher, binding)
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Call with the receiver injected according to the binding.
    pub fn call(&self, args: &[Value]) -> DispatchResult<Value> {
        match &self.binding {
            Binding::Unbound => {
                let (first, rest) =
                    args.split_first()
                        .ok_or_else(|| DispatchError::MissingReceiver {
                            member: self.dispatcher.name().to_string(),
                        })?;
                let receiver = Receiver::Instance(first.clone());
                self.dispatcher.call(Some(&receiver), rest)
            }
            Binding::Instance(value) => {
                let receiver = Receiver::Instance(value.clone());
                self.dispatcher.call(Some(&receiver), args)
            }
            Binding::Class(ty) => {
                let receiver = Receiver::Class(ty.clone());
                self.dispatcher.call(Some(&receiver), args)
            }
            Binding::Static => self.dispatcher.call(None, args),
        }
    }
}
