use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

/// Identifies a node in a state tree. Allocated from an [`IdSource`] and
/// never reused or reassigned.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StateId(pub u64);

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifies a lifecycle object within its registry. Used for identity
/// comparisons between type-erased lifecycle handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LifecycleId(pub u64);

/// A reference to a node: either its numeric id or its alias.
///
/// Serialized untagged, so data files may write `3` or `"main_menu"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateKey {
    Id(StateId),
    Alias(String),
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateKey::Id(id) => write!(f, "{id}"),
            StateKey::Alias(alias) => write!(f, "'{alias}'"),
        }
    }
}

impl From<StateId> for StateKey {
    fn from(id: StateId) -> Self {
        StateKey::Id(id)
    }
}

impl From<u64> for StateKey {
    fn from(id: u64) -> Self {
        StateKey::Id(StateId(id))
    }
}

impl From<&str> for StateKey {
    fn from(alias: &str) -> Self {
        StateKey::Alias(alias.to_string())
    }
}

impl From<String> for StateKey {
    fn from(alias: String) -> Self {
        StateKey::Alias(alias)
    }
}

impl From<&StateKey> for StateKey {
    fn from(key: &StateKey) -> Self {
        key.clone()
    }
}

// ---------------------------------------------------------------------------
// IdSource
// ---------------------------------------------------------------------------

static PROCESS_IDS: LazyLock<IdSource> = LazyLock::new(IdSource::new);

/// A shared, monotonically increasing id counter.
///
/// Cloning the handle shares the counter: every manager built from clones of
/// one source draws from the same sequence. [`IdSource::process`] is the
/// process-wide source; tests that need ids starting at zero construct their
/// own with [`IdSource::new`].
#[derive(Debug, Clone, Default)]
pub struct IdSource {
    next: Arc<AtomicU64>,
}

impl IdSource {
    /// Create an isolated source whose first id is 0.
    pub fn new() -> Self {
        Self {
            next: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The process-wide source shared by every manager built with
    /// [`StateManager::new`](crate::manager::StateManager::new).
    pub fn process() -> Self {
        PROCESS_IDS.clone()
    }

    /// Allocate the next id.
    pub fn next_id(&self) -> StateId {
        StateId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// The id the next call to [`next_id`](Self::next_id) will return.
    pub fn peek(&self) -> StateId {
        StateId(self.next.load(Ordering::Relaxed))
    }
}
