//! Stagehand Core -- hierarchical, trigger-driven state trees for games.
//!
//! Menus, levels and transient screens are arranged as a tree of states.
//! Movement between them is driven by discrete triggers rather than direct
//! calls: each state carries declarative transitions, and firing a trigger
//! resolves the first matching transition into a destination state.
//!
//! # Pieces
//!
//! - [`manager::StateManager`] -- owns the tree ([`topology::Topology`]), the
//!   per-state [`transition::TransitionTable`] and the current pointer.
//! - [`dispatch`] -- `set_initial`, `trigger` and `jump`. Destinations are
//!   named by id or alias, by [`transition::Relation`] (parent, child,
//!   sibling, ...) or by a finder function.
//! - [`lifecycle`] -- preload / start / pause / end objects with memoized
//!   asynchronous preload and automatic pre-emption of the active object.
//!
//! The two halves meet through `change` callbacks: a transition's change hook
//! typically ends the outgoing payload and starts the incoming one.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::rc::Rc;
//! use stagehand_core::prelude::*;
//!
//! let mut states: StateManager<str, &str> = StateManager::with_ids(IdSource::new());
//! let menu = states.add(Rc::from("menu"), AddOptions::default())?;
//! let level = states.add(Rc::from("level"), AddOptions::default().alias("L0").parent(menu))?;
//! states.set_initial(menu)?;
//! states.add_transitions(menu, [Transition::relation("play", Relation::Child)])?;
//! states.trigger("play")?;
//! assert_eq!(states.current_id(), Some(level));
//! ```

pub mod dispatch;
pub mod error;
pub mod event;
pub mod id;
pub mod lifecycle;
pub mod manager;
pub mod topology;
pub mod transition;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

/// Common imports for building and driving state trees.
pub mod prelude {
    pub use crate::error::{HookError, HookResult, HookStage, StateError};
    pub use crate::event::{EventSide, TriggerEvent};
    pub use crate::id::{IdSource, LifecycleId, StateId, StateKey};
    pub use crate::lifecycle::{
        Lifecycle, LifecycleError, LifecycleHooks, LifecycleObject, LifecycleOptions,
        LifecycleRegistry, Stage,
    };
    pub use crate::manager::{AddOptions, ManagerOptions, StateManager};
    pub use crate::topology::Child;
    pub use crate::transition::{Relation, Target, Transition};
}
