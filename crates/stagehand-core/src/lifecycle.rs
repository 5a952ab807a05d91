//! Lifecycle objects: preload / start / pause / end for interactive units.
//!
//! A [`LifecycleObject`] wraps user behaviour (a [`Stage`]) and drives it
//! through `Unloaded -> Preloading -> Running <-> Paused -> Ended`.
//!
//! # Preload and start
//!
//! [`LifecycleObject::preload`] calls [`Stage::preload`] at most once and
//! caches the result as a [`Shared`] future; every later call hands out a
//! clone of it. [`Lifecycle::start`] begins that preload and spawns a
//! continuation on the registry's executor, so three `start()` calls made
//! before the preload settles run the start sequence three times, once the
//! single shared preload resolves.
//!
//! # Pre-emption
//!
//! The [`LifecycleRegistry`] remembers the most recently started object.
//! Starting an object that the current one is not an ancestor of ends the
//! current one first, so entering a child keeps its parent alive while
//! entering an unrelated state replaces it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use futures::future::{self, FutureExt, LocalBoxFuture, Shared};
use futures::task::{LocalSpawn, LocalSpawnExt, SpawnError};
use tracing::{debug, trace, warn};

use crate::id::LifecycleId;

/// The memoized preload future of a lifecycle object.
pub type Preload<D> = Shared<LocalBoxFuture<'static, D>>;

/// Errors raised by lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// `end()` was called on an object without a parent.
    #[error("cannot end root lifecycle object '{name}'")]
    EndingRootState { name: String },

    /// The registry's executor refused the post-preload continuation.
    #[error("failed to spawn lifecycle continuation: {0}")]
    Spawn(#[from] SpawnError),
}

// ---------------------------------------------------------------------------
// Stage trait
// ---------------------------------------------------------------------------

/// User behaviour attached to a lifecycle object. Every hook defaults to a
/// no-op, so stages only override what they care about.
pub trait Stage: 'static {
    /// What the preload step produces. Handed to every `on_start` call.
    type Data: Clone + Default + 'static;

    /// Load whatever the stage needs before it can start. Called at most
    /// once per object. Resolves to `Data::default()` unless overridden.
    fn preload(&self) -> LocalBoxFuture<'static, Self::Data> {
        future::ready(Self::Data::default()).boxed_local()
    }

    fn on_start(&self, data: &Self::Data) {
        let _ = data;
    }

    fn on_pause(&self) {}

    fn on_unpause(&self) {}

    fn on_end(&self) {}

    /// Called on the parent after one of its children ends.
    fn on_child_end(&self, child: &dyn Lifecycle) {
        let _ = child;
    }
}

// ---------------------------------------------------------------------------
// Lifecycle trait (type-erased view)
// ---------------------------------------------------------------------------

/// The type-erased face of a lifecycle object, used for parent and child
/// links, the registry's current pointer and state-tree payloads.
///
/// Implemented only by [`LifecycleObject`]. The parent/child plumbing behind
/// `start` and `end` is internal, so a root can never be ended from outside:
///
/// ```compile_fail
/// use stagehand_core::lifecycle::Lifecycle;
///
/// fn bypass(object: &dyn Lifecycle) {
///     object.force_end();
/// }
/// ```
pub trait Lifecycle: sealed::Tree {
    fn id(&self) -> LifecycleId;

    fn name(&self) -> &str;

    fn parent(&self) -> Option<Rc<dyn Lifecycle>>;

    fn is_running(&self) -> bool;

    fn is_paused(&self) -> bool;

    /// Begin preloading and schedule the start sequence.
    fn start(&self) -> Result<(), LifecycleError>;

    /// Pause. Returns whether the state changed.
    fn pause(&self) -> bool;

    /// Unpause. Returns whether the state changed.
    fn unpause(&self) -> bool;

    /// Flip the paused flag and return the new value.
    fn toggle_pause(&self) -> bool {
        if self.is_paused() {
            self.unpause();
        } else {
            self.pause();
        }
        self.is_paused()
    }

    /// End this object and hand control back to its parent.
    fn end(&self) -> Result<(), LifecycleError>;

    /// Whether `self` appears on `other`'s parent chain.
    fn is_ancestor_of(&self, other: &dyn Lifecycle) -> bool {
        let mut cursor = other.parent();
        while let Some(node) = cursor {
            if node.id() == self.id() {
                return true;
            }
            cursor = node.parent();
        }
        false
    }
}

/// Parent/child bookkeeping between lifecycle objects. Not nameable outside
/// this module, so only the lifecycle machinery can call it.
mod sealed {
    use std::rc::Rc;

    use super::{Lifecycle, LifecycleError};

    pub trait Tree {
        fn adopt(&self, child: Rc<dyn Lifecycle>);

        fn child_started(&self, child: &dyn Lifecycle);

        fn child_ended(&self, child: &dyn Lifecycle) -> Result<(), LifecycleError>;

        /// End without the root check or parent notification. Used for pre-emption.
        fn force_end(&self);
    }
}

use sealed::Tree;

impl fmt::Debug for dyn Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("running", &self.is_running())
            .field("paused", &self.is_paused())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Observer called for a lifecycle transition of any object in a registry.
pub type LifecycleHook = Box<dyn Fn(&dyn Lifecycle)>;

/// Registry-wide observers, fired for every object's transitions.
#[derive(Default)]
pub struct LifecycleHooks {
    pub preload_begin: Option<LifecycleHook>,
    pub preload_end: Option<LifecycleHook>,
    pub start: Option<LifecycleHook>,
    pub pause: Option<LifecycleHook>,
    pub unpause: Option<LifecycleHook>,
    pub end: Option<LifecycleHook>,
}

impl LifecycleHooks {
    /// Fires on every `preload()` call, including memoized ones.
    pub fn on_preload_begin(mut self, hook: impl Fn(&dyn Lifecycle) + 'static) -> Self {
        self.preload_begin = Some(Box::new(hook));
        self
    }

    /// Fires once per object, when its preload resolves.
    pub fn on_preload_end(mut self, hook: impl Fn(&dyn Lifecycle) + 'static) -> Self {
        self.preload_end = Some(Box::new(hook));
        self
    }

    pub fn on_start(mut self, hook: impl Fn(&dyn Lifecycle) + 'static) -> Self {
        self.start = Some(Box::new(hook));
        self
    }

    pub fn on_pause(mut self, hook: impl Fn(&dyn Lifecycle) + 'static) -> Self {
        self.pause = Some(Box::new(hook));
        self
    }

    pub fn on_unpause(mut self, hook: impl Fn(&dyn Lifecycle) + 'static) -> Self {
        self.unpause = Some(Box::new(hook));
        self
    }

    pub fn on_end(mut self, hook: impl Fn(&dyn Lifecycle) + 'static) -> Self {
        self.end = Some(Box::new(hook));
        self
    }
}

fn fire(hook: &Option<LifecycleHook>, object: &dyn Lifecycle) {
    if let Some(hook) = hook {
        hook(object);
    }
}

/// Shared context for a family of lifecycle objects: the executor for
/// post-preload continuations, the registry-wide hooks, the id counter and
/// the "currently active object" pointer.
///
/// Independent registries never pre-empt each other.
pub struct LifecycleRegistry {
    spawner: Box<dyn LocalSpawn>,
    hooks: LifecycleHooks,
    current: RefCell<Option<Weak<dyn Lifecycle>>>,
    next_id: Cell<u64>,
}

impl fmt::Debug for LifecycleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleRegistry")
            .field("current", &self.current().map(|c| c.id()))
            .field("next_id", &self.next_id.get())
            .finish_non_exhaustive()
    }
}

impl LifecycleRegistry {
    pub fn new(spawner: impl LocalSpawn + 'static) -> Rc<Self> {
        Self::with_hooks(spawner, LifecycleHooks::default())
    }

    pub fn with_hooks(spawner: impl LocalSpawn + 'static, hooks: LifecycleHooks) -> Rc<Self> {
        Rc::new(Self {
            spawner: Box::new(spawner),
            hooks,
            current: RefCell::new(None),
            next_id: Cell::new(0),
        })
    }

    /// The most recently started object, if it has not ended or been dropped.
    pub fn current(&self) -> Option<Rc<dyn Lifecycle>> {
        self.current.borrow().as_ref().and_then(Weak::upgrade)
    }

    fn set_current(&self, object: Weak<dyn Lifecycle>) {
        *self.current.borrow_mut() = Some(object);
    }

    fn clear_current_if(&self, id: LifecycleId) {
        let is_current = self.current().is_some_and(|c| c.id() == id);
        if is_current {
            *self.current.borrow_mut() = None;
        }
    }

    fn allocate_id(&self) -> LifecycleId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        LifecycleId(id)
    }

    fn spawn(&self, task: impl Future<Output = ()> + 'static) -> Result<(), LifecycleError> {
        self.spawner.spawn_local(task)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// LifecycleObject
// ---------------------------------------------------------------------------

/// Construction options for a [`LifecycleObject`].
#[derive(Default)]
pub struct LifecycleOptions {
    /// Parent object. The new object is appended to the parent's children.
    pub parent: Option<Rc<dyn Lifecycle>>,
    /// Pause this object while one of its children runs.
    pub auto_pause: bool,
    /// Start the first child on start, and the next child when one ends.
    pub auto_advance: bool,
    /// Initial paused flag.
    pub paused: bool,
}

impl fmt::Debug for LifecycleOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleOptions")
            .field("parent", &self.parent.as_ref().map(|p| p.id()))
            .field("auto_pause", &self.auto_pause)
            .field("auto_advance", &self.auto_advance)
            .field("paused", &self.paused)
            .finish()
    }
}

impl LifecycleOptions {
    pub fn parent(mut self, parent: Rc<dyn Lifecycle>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn auto_pause(mut self, enabled: bool) -> Self {
        self.auto_pause = enabled;
        self
    }

    pub fn auto_advance(mut self, enabled: bool) -> Self {
        self.auto_advance = enabled;
        self
    }

    pub fn paused(mut self, paused: bool) -> Self {
        self.paused = paused;
        self
    }
}

/// A stage plus the lifecycle bookkeeping that drives it.
pub struct LifecycleObject<S: Stage> {
    id: LifecycleId,
    name: String,
    stage: S,
    registry: Rc<LifecycleRegistry>,
    parent: Option<Weak<dyn Lifecycle>>,
    children: RefCell<Vec<Rc<dyn Lifecycle>>>,
    auto_pause: bool,
    auto_advance: bool,
    running: Cell<bool>,
    paused: Cell<bool>,
    preload: RefCell<Option<Preload<S::Data>>>,
    this: Weak<Self>,
}

impl<S: Stage> fmt::Debug for LifecycleObject<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleObject")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("running", &self.running.get())
            .field("paused", &self.paused.get())
            .field("children", &self.children.borrow().len())
            .finish_non_exhaustive()
    }
}

impl<S: Stage> LifecycleObject<S> {
    /// Create an object and, if `options.parent` is set, register it as the
    /// parent's last child.
    pub fn new(
        registry: &Rc<LifecycleRegistry>,
        name: impl Into<String>,
        stage: S,
        options: LifecycleOptions,
    ) -> Rc<Self> {
        let LifecycleOptions {
            parent,
            auto_pause,
            auto_advance,
            paused,
        } = options;

        let object = Rc::new_cyclic(|this| Self {
            id: registry.allocate_id(),
            name: name.into(),
            stage,
            registry: Rc::clone(registry),
            parent: parent.as_ref().map(Rc::downgrade),
            children: RefCell::new(Vec::new()),
            auto_pause,
            auto_advance,
            running: Cell::new(false),
            paused: Cell::new(paused),
            preload: RefCell::new(None),
            this: this.clone(),
        });

        if let Some(parent) = parent {
            parent.adopt(object.clone());
        }
        trace!(lifecycle = object.id.0, name = %object.name, "lifecycle object created");
        object
    }

    pub fn stage(&self) -> &S {
        &self.stage
    }

    /// Children in creation order.
    pub fn children(&self) -> Vec<Rc<dyn Lifecycle>> {
        self.children.borrow().clone()
    }

    /// The memoized preload future. The first call invokes [`Stage::preload`];
    /// later calls return clones of the same future. The registry's
    /// preload-begin hook fires on every call, preload-end once.
    pub fn preload(&self) -> Preload<S::Data> {
        fire(&self.registry.hooks.preload_begin, self);

        if let Some(existing) = self.preload.borrow().as_ref() {
            return existing.clone();
        }

        debug!(lifecycle = self.id.0, name = %self.name, "preload started");
        let inner = self.stage.preload();
        let this = self.this.clone();
        let shared = async move {
            let data = inner.await;
            if let Some(this) = this.upgrade() {
                debug!(lifecycle = this.id.0, name = %this.name, "preload finished");
                fire(&this.registry.hooks.preload_end, &*this);
            }
            data
        }
        .boxed_local()
        .shared();

        *self.preload.borrow_mut() = Some(shared.clone());
        shared
    }

    /// Post-preload half of `start`.
    fn enter(&self, data: &S::Data) {
        self.preempt();

        self.stage.on_start(data);
        fire(&self.registry.hooks.start, self);
        self.running.set(true);
        let this: Weak<dyn Lifecycle> = self.this.clone();
        self.registry.set_current(this);
        debug!(lifecycle = self.id.0, name = %self.name, "started");

        if let Some(parent) = self.parent() {
            parent.child_started(self);
        }

        if self.auto_advance {
            let first = self.children.borrow().first().cloned();
            if let Some(first) = first
                && let Err(err) = first.start()
            {
                warn!(lifecycle = self.id.0, error = %err, "failed to advance to first child");
            }
        }
    }

    fn preempt(&self) {
        let Some(current) = self.registry.current() else {
            return;
        };
        if current.id() == self.id || current.is_ancestor_of(self) {
            return;
        }
        debug!(
            lifecycle = self.id.0,
            preempted = current.id().0,
            "ending unrelated active object"
        );
        current.force_end();
    }

    fn finish(&self) {
        self.stage.on_end();
        fire(&self.registry.hooks.end, self);
        self.running.set(false);
        self.registry.clear_current_if(self.id);
        debug!(lifecycle = self.id.0, name = %self.name, "ended");
    }
}

impl<S: Stage> Lifecycle for LifecycleObject<S> {
    fn id(&self) -> LifecycleId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn parent(&self) -> Option<Rc<dyn Lifecycle>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    fn is_running(&self) -> bool {
        self.running.get()
    }

    fn is_paused(&self) -> bool {
        self.paused.get()
    }

    fn start(&self) -> Result<(), LifecycleError> {
        let preload = self.preload();
        let this = self.this.clone();
        self.registry.spawn(async move {
            let data = preload.await;
            if let Some(this) = this.upgrade() {
                this.enter(&data);
            }
        })
    }

    fn pause(&self) -> bool {
        if self.paused.replace(true) {
            return false;
        }
        self.stage.on_pause();
        fire(&self.registry.hooks.pause, self);
        trace!(lifecycle = self.id.0, "paused");
        true
    }

    fn unpause(&self) -> bool {
        if !self.paused.replace(false) {
            return false;
        }
        self.stage.on_unpause();
        fire(&self.registry.hooks.unpause, self);
        trace!(lifecycle = self.id.0, "unpaused");
        true
    }

    fn end(&self) -> Result<(), LifecycleError> {
        let Some(parent) = self.parent() else {
            return Err(LifecycleError::EndingRootState {
                name: self.name.clone(),
            });
        };
        self.finish();
        parent.child_ended(self)
    }
}

impl<S: Stage> Tree for LifecycleObject<S> {
    fn adopt(&self, child: Rc<dyn Lifecycle>) {
        self.children.borrow_mut().push(child);
    }

    fn child_started(&self, _child: &dyn Lifecycle) {
        if self.auto_pause {
            self.pause();
        }
    }

    fn child_ended(&self, child: &dyn Lifecycle) -> Result<(), LifecycleError> {
        self.stage.on_child_end(child);
        if self.auto_pause {
            self.unpause();
        }
        if !self.auto_advance {
            return Ok(());
        }

        let next = {
            let children = self.children.borrow();
            children
                .iter()
                .position(|c| c.id() == child.id())
                .and_then(|i| children.get(i + 1).cloned())
        };
        match next {
            Some(next) => next.start(),
            None => Ok(()),
        }
    }

    fn force_end(&self) {
        self.finish();
    }
}
