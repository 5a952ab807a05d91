//! Declarative, trigger-keyed transitions and the per-node transition table.
//!
//! A [`Transition`] names its destination in exactly one of three ways (see
//! [`Target`]): an explicit id or alias, a [`Relation`] to the current node's
//! position in the tree, or a finder function evaluated at dispatch time.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::HookResult;
use crate::event::TriggerEvent;
use crate::id::{StateId, StateKey};
use crate::manager::StateManager;

// ---------------------------------------------------------------------------
// Relations
// ---------------------------------------------------------------------------

/// A destination named by its structural relation to the current node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// The current node itself.
    Same,
    /// The current node's parent. Invalid on a root.
    Parent,
    /// The current node's first child.
    Child,
    /// The next child of the parent after the current node.
    Sibling,
    /// The next sibling if there is one, otherwise the parent.
    SiblingElseUp,
}

// ---------------------------------------------------------------------------
// Callback types
// ---------------------------------------------------------------------------

/// Computes a destination from `(current id, current payload, manager)`.
/// Returning `None` (or a key that does not resolve) fails the dispatch.
pub type Finder<P, T> = Rc<dyn Fn(StateId, &Rc<P>, &StateManager<P, T>) -> Option<StateKey>>;

/// Runs during a committed transition, between `pre_trigger` and
/// `post_trigger`. An `Err` aborts the dispatch.
pub type ChangeFn<P, T> = Rc<dyn Fn(&TriggerEvent<P, T>, &mut StateManager<P, T>) -> HookResult>;

/// How a transition names its destination.
pub enum Target<P: ?Sized, T> {
    ById(StateKey),
    ByRelation(Relation),
    ByFinder(Finder<P, T>),
}

impl<P: ?Sized, T> Clone for Target<P, T> {
    fn clone(&self) -> Self {
        match self {
            Target::ById(key) => Target::ById(key.clone()),
            Target::ByRelation(relation) => Target::ByRelation(*relation),
            Target::ByFinder(finder) => Target::ByFinder(Rc::clone(finder)),
        }
    }
}

impl<P: ?Sized, T> fmt::Debug for Target<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::ById(key) => write!(f, "ById({key})"),
            Target::ByRelation(relation) => write!(f, "ByRelation({relation:?})"),
            Target::ByFinder(_) => write!(f, "ByFinder(<fn>)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

/// A directed edge out of a node, selected when its trigger fires.
///
/// A `None` trigger never matches [`StateManager::trigger`]; such entries
/// only document destinations reached through [`StateManager::jump`].
pub struct Transition<P: ?Sized, T> {
    pub trigger: Option<T>,
    pub target: Target<P, T>,
    pub change: Option<ChangeFn<P, T>>,
}

impl<P: ?Sized, T> Transition<P, T> {
    /// Transition to an explicit id or alias.
    pub fn to(trigger: impl Into<Option<T>>, key: impl Into<StateKey>) -> Self {
        Self {
            trigger: trigger.into(),
            target: Target::ById(key.into()),
            change: None,
        }
    }

    /// Transition to a node named by its relation to the current node.
    pub fn relation(trigger: impl Into<Option<T>>, relation: Relation) -> Self {
        Self {
            trigger: trigger.into(),
            target: Target::ByRelation(relation),
            change: None,
        }
    }

    /// Transition to whatever `finder` returns at dispatch time.
    pub fn find<F>(trigger: impl Into<Option<T>>, finder: F) -> Self
    where
        F: Fn(StateId, &Rc<P>, &StateManager<P, T>) -> Option<StateKey> + 'static,
    {
        Self {
            trigger: trigger.into(),
            target: Target::ByFinder(Rc::new(finder)),
            change: None,
        }
    }

    /// Attach a `change` callback.
    pub fn with_change<F>(mut self, change: F) -> Self
    where
        F: Fn(&TriggerEvent<P, T>, &mut StateManager<P, T>) -> HookResult + 'static,
    {
        self.change = Some(Rc::new(change));
        self
    }
}

impl<P: ?Sized, T: Clone> Clone for Transition<P, T> {
    fn clone(&self) -> Self {
        Self {
            trigger: self.trigger.clone(),
            target: self.target.clone(),
            change: self.change.clone(),
        }
    }
}

impl<P: ?Sized, T: fmt::Debug> fmt::Debug for Transition<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("trigger", &self.trigger)
            .field("target", &self.target)
            .field(
                "change",
                &if self.change.is_some() {
                    "Some(<fn>)"
                } else {
                    "None"
                },
            )
            .finish()
    }
}

// ---------------------------------------------------------------------------
// TransitionTable
// ---------------------------------------------------------------------------

/// Ordered transition lists keyed by node. List order is match precedence.
pub struct TransitionTable<P: ?Sized, T> {
    lists: HashMap<StateId, Vec<Transition<P, T>>>,
}

impl<P: ?Sized, T> Default for TransitionTable<P, T> {
    fn default() -> Self {
        Self {
            lists: HashMap::new(),
        }
    }
}

impl<P: ?Sized, T: fmt::Debug> fmt::Debug for TransitionTable<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.lists.iter()).finish()
    }
}

impl<P: ?Sized, T> TransitionTable<P, T> {
    /// Append transitions to the end of a node's list.
    pub fn extend(&mut self, state: StateId, transitions: impl IntoIterator<Item = Transition<P, T>>) {
        self.lists.entry(state).or_default().extend(transitions);
    }

    /// The transitions registered on a node, in precedence order.
    pub fn get(&self, state: StateId) -> &[Transition<P, T>] {
        self.lists.get(&state).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of transitions across all nodes.
    pub fn len(&self) -> usize {
        self.lists.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.values().all(Vec::is_empty)
    }
}

impl<P: ?Sized, T: PartialEq> TransitionTable<P, T> {
    /// The first transition on `state` whose trigger equals `trigger`.
    /// Later entries with the same trigger are never returned.
    pub fn first_match(&self, state: StateId, trigger: &T) -> Option<&Transition<P, T>> {
        self.get(state)
            .iter()
            .find(|t| t.trigger.as_ref() == Some(trigger))
    }
}
