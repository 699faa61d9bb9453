//! The finished, immutable dispatch table for one member name.
//!
//! # Resolution
//!
//! 1. **Exact**: the first candidate, in declaration order, whose signature
//!    is identical to the runtime argument types.
//! 2. **Coerced**: the first candidate whose every slot accepts its argument
//!    as-is or through the coercion registry. It runs with the coerced values.
//! 3. **Fallback**: the unconstrained candidate, with the original arguments.
//! 4. Otherwise a [`DispatchMismatch`].
//!
//! Declaration order is the only tie-break; candidates are never ranked by
//! specificity.

use std::sync::Arc;

use tracing::trace;

use crate::config::DispatchContext;
use crate::object::Value;

use super::candidate::{CallFrame, CandidateEntry, MemberKind, Receiver};
use super::coerce::CoercionRegistry;
use super::result::{DispatchError, DispatchMismatch, DispatchResult, ResolutionError};
use super::signature::{ArgTypes, TypeSignature};

/// Which resolution step selected a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPath {
    Exact,
    Coerced,
    Fallback,
}

/// The candidate a call would run, and the arguments it would receive.
#[derive(Debug)]
pub struct Selection<'a> {
    pub entry: &'a CandidateEntry,
    pub path: MatchPath,
    /// Coerced arguments; `None` means the originals are used.
    pub coerced: Option<Vec<Value>>,
}

/// Resolves calls to one overloaded member.
#[derive(Debug)]
pub struct Dispatcher {
    name: String,
    binding: MemberKind,
    entries: Vec<CandidateEntry>,
    fallback: Option<CandidateEntry>,
    coercions: Arc<CoercionRegistry>,
    coercion_enabled: bool,
}

impl Dispatcher {
    /// Build a dispatcher from entries in declaration order.
    ///
    /// Every constrained entry must have a resolved signature, and at most one
    /// entry may be unconstrained.
    pub fn new(
        name: impl Into<String>,
        binding: MemberKind,
        entries: Vec<CandidateEntry>,
        cx: &DispatchContext,
    ) -> DispatchResult<Self> {
        let name = name.into();
        let mut constrained = Vec::with_capacity(entries.len());
        let mut fallback: Option<CandidateEntry> = None;

        for entry in entries {
            match entry.signature() {
                None => {
                    if fallback.is_some() {
                        return Err(DispatchError::DuplicateFallback {
                            member: name,
                            index: entry.index(),
                        });
                    }
                    fallback = Some(entry);
                }
                Some(sig) => {
                    if let Some((slot, placeholder)) = sig.placeholders().next() {
                        return Err(DispatchError::UnresolvedPlaceholder {
                            member: name,
                            slot,
                            placeholder,
                        });
                    }
                    if !sig.is_resolved() {
                        return Err(ResolutionError::NotResolved {
                            signature: sig.to_string(),
                        }
                        .into());
                    }
                    constrained.push(entry);
                }
            }
        }

        Ok(Self {
            name,
            binding,
            entries: constrained,
            fallback,
            coercions: cx.coercions().clone(),
            coercion_enabled: cx.config().coercion,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// How the member binds its receiver on attribute access.
    pub fn binding(&self) -> MemberKind {
        self.binding
    }

    /// Constrained candidates, in declaration order.
    pub fn candidates(&self) -> &[CandidateEntry] {
        &self.entries
    }

    pub fn fallback(&self) -> Option<&CandidateEntry> {
        self.fallback.as_ref()
    }

    /// Every constrained signature, in declaration order.
    pub fn signatures(&self) -> impl Iterator<Item = &TypeSignature> {
        self.entries.iter().filter_map(CandidateEntry::signature)
    }

    /// Distinct arities accepted by constrained candidates, ascending.
    pub fn arities(&self) -> Vec<usize> {
        let mut arities: Vec<_> = self.signatures().map(TypeSignature::arity).collect();
        arities.sort_unstable();
        arities.dedup();
        arities
    }

    /// Pick the candidate for `args` without invoking it.
    pub fn select(&self, args: &[Value]) -> DispatchResult<Selection<'_>> {
        let arg_types = ArgTypes::of(args);

        for entry in &self.entries {
            if entry.signature().is_some_and(|sig| sig.fast_match(&arg_types)) {
                trace!(member = %self.name, index = entry.index(), "exact match");
                return Ok(Selection {
                    entry,
                    path: MatchPath::Exact,
                    coerced: None,
                });
            }
        }

        if self.coercion_enabled {
            for entry in &self.entries {
                let Some(sig) = entry.signature() else {
                    continue;
                };
                let Some(matched) = sig.coerce_match(args, &self.coercions) else {
                    continue;
                };
                if matched.values.len() == sig.arity() {
                    trace!(member = %self.name, index = entry.index(), "coerced match");
                    return Ok(Selection {
                        entry,
                        path: MatchPath::Coerced,
                        coerced: Some(matched.values),
                    });
                }
            }
        }

        if let Some(entry) = &self.fallback {
            trace!(member = %self.name, index = entry.index(), "fallback");
            return Ok(Selection {
                entry,
                path: MatchPath::Fallback,
                coerced: None,
            });
        }

        Err(DispatchMismatch {
            member: self.name.clone(),
            arg_types: arg_types.into_types(),
            signatures: self.signatures().cloned().collect(),
        }
        .into())
    }

    /// Resolve and invoke with an explicit receiver.
    pub fn call(&self, receiver: Option<&Receiver>, args: &[Value]) -> DispatchResult<Value> {
        let selection = self.select(args)?;
        let args = selection.coerced.as_deref().unwrap_or(args);
        let frame = CallFrame::new(&self.name, receiver, args);
        selection.entry.implementation().invoke(&frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::candidate::Implementation;
    use crate::dispatch::placeholder::ResolutionContext;
    use crate::dispatch::Placeholder;
    use crate::object::Ty;

    fn entry(types: &[Ty], index: usize, tag: &'static str) -> CandidateEntry {
        let sig = TypeSignature::from_slots(types.iter().cloned())
            .resolve(&ResolutionContext::empty())
            .unwrap();
        CandidateEntry::new(Some(sig), Implementation::new(move |_| Ok(Value::str(tag))), index)
    }

    fn fallback_entry(index: usize) -> CandidateEntry {
        CandidateEntry::new(None, Implementation::new(|_| Ok(Value::str("fallback"))), index)
    }

    fn dispatcher(entries: Vec<CandidateEntry>) -> Dispatcher {
        Dispatcher::new("f", MemberKind::Static, entries, &DispatchContext::default()).unwrap()
    }

    #[test]
    fn test_exact_before_coerced() {
        let d = dispatcher(vec![
            entry(&[Ty::float()], 0, "float"),
            entry(&[Ty::int()], 1, "int"),
        ]);

        // int would coerce into the first candidate, but the exact match wins.
        let sel = d.select(&[Value::Int(1)]).unwrap();
        assert_eq!(sel.path, MatchPath::Exact);
        assert_eq!(sel.entry.index(), 1);
        assert!(sel.coerced.is_none());
    }

    #[test]
    fn test_coerced_arguments_are_passed() {
        let d = Dispatcher::new(
            "halve",
            MemberKind::Static,
            vec![CandidateEntry::new(
                Some(
                    TypeSignature::from_slots([Ty::float()])
                        .resolve(&ResolutionContext::empty())
                        .unwrap(),
                ),
                Implementation::new(|frame| Ok(Value::float(frame.float(0)? / 2.0))),
                0,
            )],
            &DispatchContext::default(),
        )
        .unwrap();

        assert_eq!(d.call(None, &[Value::Int(3)]).unwrap(), Value::float(1.5));
        let sel = d.select(&[Value::Int(3)]).unwrap();
        assert_eq!(sel.path, MatchPath::Coerced);
        assert_eq!(sel.coerced, Some(vec![Value::float(3.0)]));
    }

    #[test]
    fn test_fallback_gets_original_arguments() {
        let d = Dispatcher::new(
            "echo",
            MemberKind::Static,
            vec![
                entry(&[Ty::float()], 0, "float"),
                CandidateEntry::new(
                    None,
                    Implementation::new(|frame| Ok(frame.arg(0)?.clone())),
                    1,
                ),
            ],
            &DispatchContext::default(),
        )
        .unwrap();

        assert_eq!(d.call(None, &[Value::str("x")]).unwrap(), Value::str("x"));
        assert_eq!(d.select(&[Value::str("x")]).unwrap().path, MatchPath::Fallback);
        assert_eq!(d.fallback().map(CandidateEntry::index), Some(1));
        assert_eq!(d.fallback().map(ToString::to_string).as_deref(), Some("(*)"));
        assert_eq!(d.candidates().len(), 1);
        assert_eq!(d.binding(), MemberKind::Static);
    }

    #[test]
    fn test_coercion_can_be_disabled() {
        let mut config = crate::config::DispatchConfig::default();
        config.coercion = false;
        let cx = DispatchContext::from_config(config);
        let d = Dispatcher::new("f", MemberKind::Static, vec![entry(&[Ty::float()], 0, "float")], &cx)
            .unwrap();

        let err = d.call(None, &[Value::Int(3)]).unwrap_err();
        assert!(matches!(err, DispatchError::Mismatch(_)));
    }

    #[test]
    fn test_duplicate_fallback_rejected() {
        let err = Dispatcher::new(
            "f",
            MemberKind::Static,
            vec![fallback_entry(0), fallback_entry(1)],
            &DispatchContext::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DispatchError::DuplicateFallback { index: 1, .. }));
    }

    #[test]
    fn test_unresolved_signature_rejected() {
        let unresolved = CandidateEntry::new(
            Some(TypeSignature::from_slots([Placeholder::SelfType])),
            Implementation::new(|_| Ok(Value::None)),
            0,
        );
        let err = Dispatcher::new("f", MemberKind::Static, vec![unresolved], &DispatchContext::default())
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::UnresolvedPlaceholder {
                slot: 0,
                placeholder: Placeholder::SelfType,
                ..
            }
        ));

        let never_resolved = CandidateEntry::new(
            Some(TypeSignature::from_slots([Ty::int()])),
            Implementation::new(|_| Ok(Value::None)),
            0,
        );
        let err = Dispatcher::new("f", MemberKind::Static, vec![never_resolved], &DispatchContext::default())
            .unwrap_err();
        assert!(matches!(err, DispatchError::Resolution(ResolutionError::NotResolved { .. })));
    }

    #[test]
    fn test_arities() {
        let d = dispatcher(vec![
            entry(&[Ty::int(), Ty::int()], 0, "a"),
            entry(&[Ty::int()], 1, "b"),
            entry(&[Ty::str(), Ty::str()], 2, "c"),
        ]);
        assert_eq!(d.arities(), vec![1, 2]);
        assert_eq!(d.signatures().count(), 3);
    }
}
