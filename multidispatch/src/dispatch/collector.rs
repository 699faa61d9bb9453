//! Collecting candidates while a type is built, and turning them into
//! dispatchers once the type exists.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::config::DispatchContext;
use crate::object::{Member, Namespace, Ty, Value};

use super::candidate::{Candidate, CandidateEntry, MemberKind};
use super::dispatcher::Dispatcher;
use super::placeholder::{Placeholder, ResolutionContext};
use super::result::{DispatchError, DispatchResult};

/// An assignment made while a type body is being built.
#[derive(Debug, Clone)]
pub enum NamespaceItem {
    Value(Value),
    Candidate(Candidate),
}

/// What the namespace should do with an assignment after a visitor saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    /// The visitor took the item; nothing is stored verbatim.
    Consumed,
    /// Store this value under the name.
    Store(Value),
}

/// Observes namespace assignments during a type build.
pub trait NamespaceVisitor {
    /// Called for every assignment; `previous` is the value currently stored
    /// under `name`, if any.
    fn on_assign(
        &mut self,
        name: &str,
        item: NamespaceItem,
        previous: Option<&Member>,
    ) -> DispatchResult<Assignment>;

    /// Called once the type exists; returns the namespace to install.
    fn on_finish(&mut self, namespace: Namespace, cx: &ResolutionContext) -> DispatchResult<Namespace>;
}

#[derive(Debug)]
struct CandidateGroup {
    kind: MemberKind,
    candidates: Vec<Candidate>,
    has_fallback: bool,
}

/// Groups declared candidates per name, in declaration order.
#[derive(Debug)]
pub struct SignatureCollector {
    type_name: String,
    groups: IndexMap<String, CandidateGroup>,
    accepts_descriptor: bool,
    context: DispatchContext,
    finalized: bool,
}

impl SignatureCollector {
    pub fn new(type_name: impl Into<String>, context: DispatchContext) -> Self {
        Self {
            type_name: type_name.into(),
            groups: IndexMap::new(),
            accepts_descriptor: false,
            context,
            finalized: false,
        }
    }

    /// Allow `DescriptorInstance` placeholders in observed signatures.
    pub fn accept_descriptor(&mut self) {
        self.accepts_descriptor = true;
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Names with collected candidates, in first-declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn candidate_count(&self, name: &str) -> usize {
        self.groups.get(name).map_or(0, |g| g.candidates.len())
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Record one declared candidate for `name`.
    ///
    /// Registration errors surface here, before the type is finished.
    pub fn observe(&mut self, name: &str, candidate: Candidate) -> DispatchResult<()> {
        if self.finalized {
            return Err(DispatchError::AlreadyFinalized {
                type_name: self.type_name.clone(),
            });
        }

        if let (Some(sig), false) = (candidate.signature(), self.accepts_descriptor) {
            let descriptor_slot = sig
                .placeholders()
                .find(|(_, p)| *p == Placeholder::DescriptorInstance);
            if let Some((slot, _)) = descriptor_slot {
                return Err(DispatchError::MalformedSignature {
                    member: name.to_string(),
                    reason: format!(
                        "slot {} of {} names the descriptor, but `{}` has no descriptor",
                        slot, sig, self.type_name
                    ),
                });
            }
        }

        let index = self.candidate_count(name);
        let group = self
            .groups
            .entry(name.to_string())
            .or_insert_with(|| CandidateGroup {
                kind: candidate.kind(),
                candidates: Vec::new(),
                has_fallback: false,
            });

        if group.kind != candidate.kind() {
            return Err(DispatchError::MixedBindingModes {
                member: name.to_string(),
                first: group.kind,
                second: candidate.kind(),
            });
        }

        let is_fallback = candidate.is_fallback();
        if is_fallback {
            if group.has_fallback {
                return Err(DispatchError::DuplicateFallback {
                    member: name.to_string(),
                    index,
                });
            }
            group.has_fallback = true;
        }
        group.candidates.push(candidate);

        debug!(
            type_name = %self.type_name,
            member = name,
            index,
            fallback = is_fallback,
            "observed candidate"
        );
        Ok(())
    }

    /// Drop every candidate collected for `name`, returning how many there were.
    pub fn forget(&mut self, name: &str) -> usize {
        self.groups
            .shift_remove(name)
            .map_or(0, |g| g.candidates.len())
    }

    /// Resolve every signature against `owner` and build one dispatcher per name.
    pub fn finalize(&mut self, owner: &Ty) -> DispatchResult<IndexMap<String, Arc<Dispatcher>>> {
        self.finalize_with(&ResolutionContext::for_type(owner))
    }

    /// Like [`SignatureCollector::finalize`], with explicit placeholder bindings.
    pub fn finalize_with(
        &mut self,
        cx: &ResolutionContext,
    ) -> DispatchResult<IndexMap<String, Arc<Dispatcher>>> {
        if self.finalized {
            return Err(DispatchError::AlreadyFinalized {
                type_name: self.type_name.clone(),
            });
        }
        self.finalized = true;

        let mut dispatchers = IndexMap::with_capacity(self.groups.len());
        for (name, group) in std::mem::take(&mut self.groups) {
            let mut entries = Vec::with_capacity(group.candidates.len());
            for (index, candidate) in group.candidates.into_iter().enumerate() {
                let (signature, implementation) = candidate.into_parts();
                let signature = match signature {
                    Some(sig) => Some(sig.resolve(cx)?),
                    None => None,
                };
                entries.push(CandidateEntry::new(signature, implementation, index));
            }

            for entry in &entries {
                if let Some((slot, placeholder)) =
                    entry.signature().and_then(|sig| sig.placeholders().next())
                {
                    return Err(DispatchError::UnresolvedPlaceholder {
                        member: name,
                        slot,
                        placeholder,
                    });
                }
            }

            let dispatcher = Dispatcher::new(name.clone(), group.kind, entries, &self.context)?;
            debug!(
                type_name = %self.type_name,
                member = %name,
                candidates = dispatcher.candidates().len(),
                fallback = dispatcher.fallback().is_some(),
                "installed dispatcher"
            );
            dispatchers.insert(name, Arc::new(dispatcher));
        }

        Ok(dispatchers)
    }
}

impl NamespaceVisitor for SignatureCollector {
    fn on_assign(
        &mut self,
        name: &str,
        item: NamespaceItem,
        _previous: Option<&Member>,
    ) -> DispatchResult<Assignment> {
        match item {
            NamespaceItem::Candidate(candidate) => {
                self.observe(name, candidate)?;
                Ok(Assignment::Consumed)
            }
            NamespaceItem::Value(value) => {
                let shadowed = self.forget(name);
                if shadowed > 0 {
                    warn!(
                        type_name = %self.type_name,
                        member = name,
                        shadowed,
                        "plain assignment shadows overload candidates"
                    );
                }
                Ok(Assignment::Store(value))
            }
        }
    }

    fn on_finish(&mut self, mut namespace: Namespace, cx: &ResolutionContext) -> DispatchResult<Namespace> {
        for (name, dispatcher) in self.finalize_with(cx)? {
            namespace.insert(name, Member::Dispatcher(dispatcher));
        }
        Ok(namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::candidate::{fallback, overload};
    use crate::dispatch::signature::TypeSlot;

    fn collector() -> SignatureCollector {
        SignatureCollector::new("Shape", DispatchContext::default())
    }

    fn unit() -> impl Fn(&crate::dispatch::CallFrame<'_>) -> DispatchResult<Value> + Send + Sync {
        |_| Ok(Value::None)
    }

    #[test]
    fn test_groups_per_name_in_order() {
        let mut c = collector();
        c.observe("area", overload([Ty::int()]).wrap(unit())).unwrap();
        c.observe("scale", overload([Ty::float()]).wrap(unit())).unwrap();
        c.observe("area", overload([Ty::float()]).wrap(unit())).unwrap();

        assert_eq!(c.names().collect::<Vec<_>>(), vec!["area", "scale"]);
        assert_eq!(c.candidate_count("area"), 2);
        assert_eq!(c.candidate_count("missing"), 0);
    }

    #[test]
    fn test_duplicate_fallback_at_observe() {
        let mut c = collector();
        c.observe("f", fallback().wrap(unit())).unwrap();
        c.observe("f", overload([Ty::int()]).wrap(unit())).unwrap();
        let err = c.observe("f", fallback().wrap(unit())).unwrap_err();

        assert!(matches!(err, DispatchError::DuplicateFallback { ref member, index: 2 } if member == "f"));
        assert_eq!(err.to_string(), "duplicate fallback for `f`: candidate #2 is a second unconstrained candidate");

        // A fallback under another name is fine.
        c.observe("g", fallback().wrap(unit())).unwrap();
    }

    #[test]
    fn test_mixed_binding_modes() {
        let mut c = collector();
        c.observe("f", overload([Ty::int()]).wrap(unit())).unwrap();
        let err = c
            .observe("f", overload([Ty::str()]).static_member().wrap(unit()))
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::MixedBindingModes {
                first: MemberKind::Instance,
                second: MemberKind::Static,
                ..
            }
        ));
    }

    #[test]
    fn test_descriptor_placeholder_needs_descriptor() {
        let mut c = collector();
        let candidate = overload([TypeSlot::from(Placeholder::DescriptorInstance)]).wrap(unit());
        let err = c.observe("get", candidate.clone()).unwrap_err();
        assert!(matches!(err, DispatchError::MalformedSignature { .. }));

        c.accept_descriptor();
        c.observe("get", candidate).unwrap();
    }

    #[test]
    fn test_finalize_resolves_self() {
        let owner = Ty::declare("Shape", vec![]);
        let mut c = collector();
        c.observe("eq", overload([Placeholder::SelfType]).wrap(unit())).unwrap();

        let dispatchers = c.finalize(&owner).unwrap();
        let eq = &dispatchers["eq"];
        let sig = eq.signatures().next().unwrap();
        assert!(sig.is_resolved());
        assert_eq!(sig.slots(), &[TypeSlot::Concrete(owner.clone())]);
    }

    #[test]
    fn test_finalize_only_once() {
        let owner = Ty::declare("Shape", vec![]);
        let mut c = collector();
        c.observe("f", overload([Ty::int()]).wrap(unit())).unwrap();
        c.finalize(&owner).unwrap();

        assert!(matches!(c.finalize(&owner), Err(DispatchError::AlreadyFinalized { .. })));
        assert!(matches!(
            c.observe("f", overload([Ty::int()]).wrap(unit())),
            Err(DispatchError::AlreadyFinalized { .. })
        ));
    }

    #[test]
    fn test_plain_assignment_shadows_candidates() {
        let mut c = collector();
        let consumed = c
            .on_assign("f", NamespaceItem::Candidate(overload([Ty::int()]).wrap(unit())), None)
            .unwrap();
        assert_eq!(consumed, Assignment::Consumed);

        let stored = c.on_assign("f", NamespaceItem::Value(Value::Int(1)), None).unwrap();
        assert_eq!(stored, Assignment::Store(Value::Int(1)));
        assert!(c.is_empty());
    }

    #[test]
    fn test_on_finish_replaces_raw_entries() {
        let owner = Ty::declare("Shape", vec![]);
        let mut c = collector();
        let mut ns = Namespace::new();
        ns.insert("f".to_string(), Member::Value(Value::Int(0)));
        ns.insert("g".to_string(), Member::Value(Value::Int(1)));
        c.observe("f", overload([Ty::int()]).wrap(unit())).unwrap();

        let ns = c.on_finish(ns, &ResolutionContext::for_type(&owner)).unwrap();
        assert!(ns["f"].as_dispatcher().is_some());
        assert!(matches!(ns["g"], Member::Value(Value::Int(1))));
    }
}
