//! The state manager: owns the topology, the transition table, the current
//! pointer and the manager-level dispatch hooks.
//!
//! Building operations ([`StateManager::add`], [`StateManager::append_child`],
//! [`StateManager::set_parent`], [`StateManager::add_transitions`]) live here
//! together with the read-only queries. Dispatch (`set_initial`, `trigger`,
//! `jump`) lives in [`crate::dispatch`].

use std::fmt;
use std::rc::Rc;

use crate::error::{HookResult, StateError};
use crate::event::TriggerEvent;
use crate::id::{IdSource, StateId, StateKey};
use crate::topology::{Ancestors, Child, Topology};
use crate::transition::{Transition, TransitionTable};

/// A manager-level hook run on every dispatch.
pub type TriggerHook<P, T> = Box<dyn FnMut(&TriggerEvent<P, T>) -> HookResult>;

/// Replacement for the default "no transition for trigger" failure. Receives
/// the unmatched trigger and the current payload.
pub type EmptyTransitionHandler<P, T> = Box<dyn FnMut(&T, &Rc<P>) -> Result<(), StateError>>;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Hooks supplied at manager construction.
pub struct ManagerOptions<P: ?Sized, T> {
    pub pre_trigger: Option<TriggerHook<P, T>>,
    pub post_trigger: Option<TriggerHook<P, T>>,
}

impl<P: ?Sized, T> Default for ManagerOptions<P, T> {
    fn default() -> Self {
        Self {
            pre_trigger: None,
            post_trigger: None,
        }
    }
}

impl<P: ?Sized, T> ManagerOptions<P, T> {
    pub fn pre_trigger(mut self, hook: impl FnMut(&TriggerEvent<P, T>) -> HookResult + 'static) -> Self {
        self.pre_trigger = Some(Box::new(hook));
        self
    }

    pub fn post_trigger(mut self, hook: impl FnMut(&TriggerEvent<P, T>) -> HookResult + 'static) -> Self {
        self.post_trigger = Some(Box::new(hook));
        self
    }
}

/// Options for [`StateManager::add`].
pub struct AddOptions<P: ?Sized, T> {
    pub alias: Option<String>,
    pub parent: Option<StateKey>,
    pub children: Vec<Child<P>>,
    pub transitions: Vec<Transition<P, T>>,
}

impl<P: ?Sized, T> Default for AddOptions<P, T> {
    fn default() -> Self {
        Self {
            alias: None,
            parent: None,
            children: Vec::new(),
            transitions: Vec::new(),
        }
    }
}

impl<P: ?Sized, T> AddOptions<P, T> {
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn parent(mut self, parent: impl Into<StateKey>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn child(mut self, child: impl Into<Child<P>>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn transition(mut self, transition: Transition<P, T>) -> Self {
        self.transitions.push(transition);
        self
    }

    pub fn transitions(mut self, transitions: impl IntoIterator<Item = Transition<P, T>>) -> Self {
        self.transitions.extend(transitions);
        self
    }
}

// ---------------------------------------------------------------------------
// StateManager
// ---------------------------------------------------------------------------

/// A tree of states with trigger-driven movement between them.
///
/// `P` is the payload type (often `dyn Lifecycle`), `T` the trigger type.
pub struct StateManager<P: ?Sized, T> {
    pub(crate) topology: Topology<P>,
    pub(crate) transitions: TransitionTable<P, T>,
    pub(crate) current: Option<StateId>,
    pub(crate) pre_trigger: Option<TriggerHook<P, T>>,
    pub(crate) post_trigger: Option<TriggerHook<P, T>>,
    pub(crate) on_empty_transition: Option<EmptyTransitionHandler<P, T>>,
}

impl<P: ?Sized, T: fmt::Debug> fmt::Debug for StateManager<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateManager")
            .field("topology", &self.topology)
            .field("transitions", &self.transitions)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl<P: ?Sized, T> Default for StateManager<P, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ?Sized, T> StateManager<P, T> {
    /// Create a manager drawing ids from the process-wide [`IdSource`].
    pub fn new() -> Self {
        Self::with_options(IdSource::process(), ManagerOptions::default())
    }

    /// Create a manager drawing ids from `ids`.
    pub fn with_ids(ids: IdSource) -> Self {
        Self::with_options(ids, ManagerOptions::default())
    }

    pub fn with_options(ids: IdSource, options: ManagerOptions<P, T>) -> Self {
        Self {
            topology: Topology::new(ids),
            transitions: TransitionTable::default(),
            current: None,
            pre_trigger: options.pre_trigger,
            post_trigger: options.post_trigger,
            on_empty_transition: None,
        }
    }

    /// Replace the hook run before every `change` callback.
    pub fn set_pre_trigger(&mut self, hook: impl FnMut(&TriggerEvent<P, T>) -> HookResult + 'static) {
        self.pre_trigger = Some(Box::new(hook));
    }

    /// Replace the hook run after every `change` callback.
    pub fn set_post_trigger(&mut self, hook: impl FnMut(&TriggerEvent<P, T>) -> HookResult + 'static) {
        self.post_trigger = Some(Box::new(hook));
    }

    // -- Building -----------------------------------------------------------

    /// Add a node for `payload`. The alias, parent and existing children are
    /// all checked before anything is created.
    pub fn add(&mut self, payload: Rc<P>, options: AddOptions<P, T>) -> Result<StateId, StateError> {
        let AddOptions {
            alias,
            parent,
            children,
            transitions,
        } = options;

        let parent = parent
            .map(|key| self.topology.resolve(&key))
            .transpose()?;
        for child in &children {
            if let Child::Existing(key) = child {
                self.topology.resolve(key)?;
            }
        }

        let id = self.topology.insert(payload, alias)?;
        if let Some(parent) = parent {
            self.topology.set_parent(&id.into(), &parent.into())?;
        }
        for child in children {
            self.topology.append_child(&id.into(), child)?;
        }
        self.transitions.extend(id, transitions);
        Ok(id)
    }

    /// Append a child under `parent`, creating a node for a bare payload or
    /// moving an existing node.
    pub fn append_child(
        &mut self,
        parent: impl Into<StateKey>,
        child: impl Into<Child<P>>,
    ) -> Result<StateId, StateError> {
        self.topology.append_child(&parent.into(), child.into())
    }

    /// Append several children in order. Stops at the first failure.
    pub fn append_children(
        &mut self,
        parent: impl Into<StateKey>,
        children: impl IntoIterator<Item = Child<P>>,
    ) -> Result<Vec<StateId>, StateError> {
        let parent = self.topology.resolve(&parent.into())?;
        children
            .into_iter()
            .map(|child| self.topology.append_child(&parent.into(), child))
            .collect()
    }

    /// Move `child` under `parent`.
    pub fn set_parent(&mut self, child: impl Into<StateKey>, parent: impl Into<StateKey>) -> Result<(), StateError> {
        self.topology.set_parent(&child.into(), &parent.into())
    }

    /// Append transitions to the node at `key`.
    pub fn add_transitions(
        &mut self,
        key: impl Into<StateKey>,
        transitions: impl IntoIterator<Item = Transition<P, T>>,
    ) -> Result<(), StateError> {
        let id = self.topology.resolve(&key.into())?;
        self.transitions.extend(id, transitions);
        Ok(())
    }

    // -- Queries ------------------------------------------------------------

    /// The underlying node store.
    pub fn topology(&self) -> &Topology<P> {
        &self.topology
    }

    /// The transitions registered on `key`, in precedence order.
    pub fn transitions(&self, key: impl Into<StateKey>) -> Result<&[Transition<P, T>], StateError> {
        let id = self.topology.resolve(&key.into())?;
        Ok(self.transitions.get(id))
    }

    pub fn at(&self, key: impl Into<StateKey>) -> Result<&Rc<P>, StateError> {
        self.topology.at(&key.into())
    }

    /// Resolve `key` to a node id.
    pub fn id(&self, key: impl Into<StateKey>) -> Result<StateId, StateError> {
        self.topology.resolve(&key.into())
    }

    pub fn alias_at(&self, key: impl Into<StateKey>) -> Result<Option<&str>, StateError> {
        self.topology.alias_at(&key.into())
    }

    pub fn has(&self, key: impl Into<StateKey>) -> bool {
        self.topology.has(&key.into())
    }

    pub fn has_children(&self, key: impl Into<StateKey>) -> Result<bool, StateError> {
        self.topology.has_children(&key.into())
    }

    pub fn parent_of(&self, key: impl Into<StateKey>) -> Result<StateId, StateError> {
        self.topology.parent_of(&key.into())
    }

    pub fn keys(&self) -> impl Iterator<Item = StateId> + '_ {
        self.topology.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Rc<P>> + '_ {
        self.topology.values()
    }

    pub fn entries(&self) -> impl Iterator<Item = (StateId, &Rc<P>)> + '_ {
        self.topology.entries()
    }

    pub fn children(
        &self,
        key: impl Into<StateKey>,
    ) -> Result<impl Iterator<Item = (StateId, &Rc<P>)> + '_, StateError> {
        self.topology.children(&key.into())
    }

    pub fn siblings(
        &self,
        key: impl Into<StateKey>,
    ) -> Result<impl Iterator<Item = (StateId, &Rc<P>)> + '_, StateError> {
        self.topology.siblings(&key.into())
    }

    pub fn ancestors(&self, key: impl Into<StateKey>, strict: bool) -> Result<Ancestors<'_, P>, StateError> {
        self.topology.ancestors(&key.into(), strict)
    }

    pub fn count(&self, payload: &Rc<P>) -> usize {
        self.topology.count(payload)
    }

    pub fn is_unique(&self, payload: &Rc<P>) -> bool {
        self.topology.is_unique(payload)
    }

    pub fn len(&self) -> usize {
        self.topology.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topology.is_empty()
    }
}
