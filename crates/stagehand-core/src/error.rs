use crate::id::{StateId, StateKey};
use crate::transition::Relation;

/// Boxed error returned by user hooks to abort a dispatch.
pub type HookError = Box<dyn std::error::Error + 'static>;

/// Result type of `pre_trigger`, `change` and `post_trigger` hooks.
pub type HookResult = Result<(), HookError>;

/// Which dispatch hook failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    PreTrigger,
    Change,
    PostTrigger,
}

/// Errors raised by the topology store and the dispatch engine.
///
/// All of these are contract violations: they propagate to the direct caller
/// and leave the manager's current pointer untouched.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// An id or alias did not resolve to a node.
    #[error("no such state: {0}")]
    NoSuchState(StateKey),

    /// An alias was registered twice in the same tree.
    #[error("alias '{0}' is already registered")]
    DuplicateAlias(String),

    /// `set_initial` was called on a manager that already has a current node.
    #[error("state manager is already initialised")]
    AlreadyInitialised,

    /// A trigger or jump was attempted before `set_initial`.
    #[error("state manager has no current state; call set_initial first")]
    NotInitialised,

    /// A parent-relative query was made on a root node.
    #[error("state {0} has no parent")]
    NoParent(StateId),

    /// The `sibling` relation ran past the last child.
    #[error("state {0} has no next sibling")]
    NoMoreSiblings(StateId),

    /// A relation cannot be resolved from the current node's position.
    #[error("cannot resolve {relation:?} from state {from}: {reason}")]
    InvalidTransition {
        from: StateId,
        relation: Relation,
        reason: &'static str,
    },

    /// A finder function (or childless `child` relation) produced nothing usable.
    #[error("transition target from state {from} could not be resolved")]
    UnresolvedTransitionTarget { from: StateId },

    /// No transition on the current node matches the fired trigger.
    #[error("no transition for trigger {trigger} on state {state}")]
    NoTransitionForTrigger { trigger: String, state: StateId },

    /// A user hook returned an error and the dispatch was aborted.
    #[error("{hook:?} hook aborted the transition: {source}")]
    HookFailed {
        hook: HookStage,
        #[source]
        source: HookError,
    },
}
