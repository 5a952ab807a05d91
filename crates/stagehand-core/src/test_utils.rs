//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::channel::oneshot;
use futures::executor::LocalPool;
use futures::future::{self, FutureExt, LocalBoxFuture};

use crate::id::IdSource;
use crate::lifecycle::{Lifecycle, LifecycleRegistry, Stage};
use crate::manager::StateManager;

// ===========================================================================
// Call log
// ===========================================================================

/// An append-only log of hook calls, shared between stages under test.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    /// Number of entries exactly equal to `entry`.
    pub fn count(&self, entry: &str) -> usize {
        self.0.borrow().iter().filter(|e| *e == entry).count()
    }
}

// ===========================================================================
// Recording stage
// ===========================================================================

enum PreloadSource {
    Ready(String),
    Gated(Option<oneshot::Receiver<String>>),
}

/// A [`Stage`] that records every hook into a [`CallLog`] as
/// `"{label}:{hook}"`, with start entries carrying the preload data.
pub struct RecordingStage {
    label: String,
    log: CallLog,
    source: RefCell<PreloadSource>,
    preload_calls: Cell<u32>,
}

impl RecordingStage {
    /// A stage whose preload resolves immediately to `data`.
    pub fn ready(label: &str, data: &str, log: &CallLog) -> Self {
        Self {
            label: label.to_string(),
            log: log.clone(),
            source: RefCell::new(PreloadSource::Ready(data.to_string())),
            preload_calls: Cell::new(0),
        }
    }

    /// A stage whose preload resolves when the returned sender fires.
    pub fn gated(label: &str, log: &CallLog) -> (Self, oneshot::Sender<String>) {
        let (tx, rx) = oneshot::channel();
        let stage = Self {
            label: label.to_string(),
            log: log.clone(),
            source: RefCell::new(PreloadSource::Gated(Some(rx))),
            preload_calls: Cell::new(0),
        };
        (stage, tx)
    }

    /// How many times [`Stage::preload`] ran.
    pub fn preload_calls(&self) -> u32 {
        self.preload_calls.get()
    }

    fn record(&self, hook: &str) {
        self.log.push(format!("{}:{hook}", self.label));
    }
}

impl Stage for RecordingStage {
    type Data = String;

    fn preload(&self) -> LocalBoxFuture<'static, String> {
        self.preload_calls.set(self.preload_calls.get() + 1);
        self.record("preload");
        match &mut *self.source.borrow_mut() {
            PreloadSource::Ready(data) => future::ready(data.clone()).boxed_local(),
            PreloadSource::Gated(rx) => match rx.take() {
                Some(rx) => rx.map(Result::unwrap_or_default).boxed_local(),
                None => future::ready(String::new()).boxed_local(),
            },
        }
    }

    fn on_start(&self, data: &String) {
        self.record(&format!("start:{data}"));
    }

    fn on_pause(&self) {
        self.record("pause");
    }

    fn on_unpause(&self) {
        self.record("unpause");
    }

    fn on_end(&self) {
        self.record("end");
    }

    fn on_child_end(&self, child: &dyn Lifecycle) {
        self.record(&format!("child_end:{}", child.name()));
    }
}

// ===========================================================================
// Constructors
// ===========================================================================

/// A local executor and a registry spawning onto it.
pub fn local_registry() -> (LocalPool, Rc<LifecycleRegistry>) {
    let pool = LocalPool::new();
    let registry = LifecycleRegistry::new(pool.spawner());
    (pool, registry)
}

/// A manager with an isolated id source, so ids start at 0.
pub fn isolated_manager<P: ?Sized, T>() -> StateManager<P, T> {
    StateManager::with_ids(IdSource::new())
}
