//! Trigger dispatch: resolves a fired trigger against the current node's
//! transitions and commits the move.
//!
//! Hook order on every committed dispatch is fixed:
//!
//! 1. `pre_trigger(event)`
//! 2. the transition's `change(event, manager)`
//! 3. `post_trigger(event)`
//! 4. `current = target`
//!
//! Any error before step 4, whether from resolution or from a hook, leaves
//! the current node unchanged.

use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::error::{HookResult, HookStage, StateError};
use crate::event::{EventSide, TriggerEvent};
use crate::id::{StateId, StateKey};
use crate::manager::StateManager;
use crate::transition::{ChangeFn, Relation, Target};

impl<P: ?Sized, T> StateManager<P, T> {
    /// Set the initial current node. Allowed once per manager.
    pub fn set_initial(&mut self, key: impl Into<StateKey>) -> Result<StateId, StateError> {
        if self.current.is_some() {
            return Err(StateError::AlreadyInitialised);
        }
        let id = self.topology.resolve(&key.into())?;
        self.current = Some(id);
        debug!(state = %id, "initial state set");
        Ok(id)
    }

    /// The current node's payload, once initialised.
    pub fn current(&self) -> Option<&Rc<P>> {
        self.current
            .and_then(|id| self.topology.node(id))
            .map(|n| &n.payload)
    }

    pub fn current_id(&self) -> Option<StateId> {
        self.current
    }

    pub fn current_alias(&self) -> Option<&str> {
        self.current
            .and_then(|id| self.topology.node(id))
            .and_then(|n| n.alias.as_deref())
    }

    /// Replace the response to a trigger that matches no transition. The
    /// default fails with [`StateError::NoTransitionForTrigger`].
    pub fn set_on_empty_transition(
        &mut self,
        handler: impl FnMut(&T, &Rc<P>) -> Result<(), StateError> + 'static,
    ) {
        self.on_empty_transition = Some(Box::new(handler));
    }

    /// Resolve the node a relation names, as seen from `from`.
    pub fn resolve_relation(&self, from: StateId, relation: Relation) -> Result<StateId, StateError> {
        let node = self
            .topology
            .node(from)
            .ok_or(StateError::NoSuchState(from.into()))?;

        match relation {
            Relation::Same => Ok(from),
            Relation::Parent => node.parent.ok_or(StateError::InvalidTransition {
                from,
                relation,
                reason: "a root state has no parent",
            }),
            Relation::Child => node
                .children
                .first()
                .copied()
                .ok_or(StateError::UnresolvedTransitionTarget { from }),
            Relation::Sibling => self
                .next_sibling(from)
                .ok_or(StateError::NoMoreSiblings(from)),
            Relation::SiblingElseUp => match self.next_sibling(from) {
                Some(next) => Ok(next),
                None => node.parent.ok_or(StateError::InvalidTransition {
                    from,
                    relation,
                    reason: "a root state has no sibling or parent",
                }),
            },
        }
    }

    fn next_sibling(&self, of: StateId) -> Option<StateId> {
        let parent = self.topology.node(of)?.parent?;
        let siblings = &self.topology.node(parent)?.children;
        let position = siblings.iter().position(|&c| c == of)?;
        siblings.get(position + 1).copied()
    }

    fn resolve_target(&self, from: StateId, target: &Target<P, T>) -> Result<StateId, StateError> {
        match target {
            Target::ById(key) => self.topology.resolve(key),
            Target::ByFinder(finder) => {
                let payload = self
                    .topology
                    .node(from)
                    .map(|n| &n.payload)
                    .ok_or(StateError::NoSuchState(from.into()))?;
                finder(from, payload, self)
                    .and_then(|key| self.topology.try_resolve(&key))
                    .ok_or(StateError::UnresolvedTransitionTarget { from })
            }
            Target::ByRelation(relation) => self.resolve_relation(from, *relation),
        }
    }

    fn side(&self, id: StateId) -> Result<EventSide<P>, StateError> {
        let node = self
            .topology
            .node(id)
            .ok_or(StateError::NoSuchState(id.into()))?;
        Ok(EventSide {
            id,
            alias: node.alias.clone(),
            payload: Rc::clone(&node.payload),
        })
    }

    fn initialised(&self) -> Result<StateId, StateError> {
        self.current.ok_or(StateError::NotInitialised)
    }
}

impl<P: ?Sized, T: PartialEq + Clone + fmt::Debug> StateManager<P, T> {
    /// Fire a trigger from the current node.
    ///
    /// Returns the new current id, or `None` when no transition matched and
    /// a custom empty-transition handler accepted the trigger.
    pub fn trigger(&mut self, value: T) -> Result<Option<StateId>, StateError> {
        let from = self.initialised()?;

        let matched = self
            .transitions
            .first_match(from, &value)
            .map(|t| (t.target.clone(), t.change.clone()));

        let Some((target, change)) = matched else {
            return self.empty_transition(from, &value).map(|()| None);
        };

        let to = self.resolve_target(from, &target)?;
        self.commit(Some(value), from, to, change).map(Some)
    }

    /// Move to `key` unconditionally. The event's trigger is `None`.
    pub fn jump(&mut self, key: impl Into<StateKey>) -> Result<StateId, StateError> {
        let from = self.initialised()?;
        let to = self.topology.resolve(&key.into())?;
        self.commit(None, from, to, None)
    }

    /// Like [`jump`](Self::jump), running `change` between the manager hooks.
    pub fn jump_with<F>(&mut self, key: impl Into<StateKey>, change: F) -> Result<StateId, StateError>
    where
        F: Fn(&TriggerEvent<P, T>, &mut StateManager<P, T>) -> HookResult + 'static,
    {
        let from = self.initialised()?;
        let to = self.topology.resolve(&key.into())?;
        let change: ChangeFn<P, T> = Rc::new(change);
        self.commit(None, from, to, Some(change))
    }

    fn empty_transition(&mut self, from: StateId, value: &T) -> Result<(), StateError> {
        let payload = self.side(from)?.payload;
        match self.on_empty_transition.as_mut() {
            Some(handler) => handler(value, &payload),
            None => {
                warn!(state = %from, trigger = ?value, "no transition for trigger");
                Err(StateError::NoTransitionForTrigger {
                    trigger: format!("{value:?}"),
                    state: from,
                })
            }
        }
    }

    fn commit(
        &mut self,
        trigger: Option<T>,
        from: StateId,
        to: StateId,
        change: Option<ChangeFn<P, T>>,
    ) -> Result<StateId, StateError> {
        let event = TriggerEvent {
            trigger,
            from: self.side(from)?,
            to: self.side(to)?,
        };

        if let Some(hook) = self.pre_trigger.as_mut() {
            hook(&event).map_err(|source| StateError::HookFailed {
                hook: HookStage::PreTrigger,
                source,
            })?;
        }
        if let Some(change) = change {
            change(&event, self).map_err(|source| StateError::HookFailed {
                hook: HookStage::Change,
                source,
            })?;
        }
        if let Some(hook) = self.post_trigger.as_mut() {
            hook(&event).map_err(|source| StateError::HookFailed {
                hook: HookStage::PostTrigger,
                source,
            })?;
        }

        self.current = Some(to);
        debug!(from = %from, to = %to, trigger = ?event.trigger, "transition committed");
        Ok(to)
    }
}
