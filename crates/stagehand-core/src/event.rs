use std::fmt;
use std::rc::Rc;

use crate::id::StateId;

/// One end of a transition: the node's id, alias and payload.
pub struct EventSide<P: ?Sized> {
    pub id: StateId,
    pub alias: Option<String>,
    pub payload: Rc<P>,
}

impl<P: ?Sized> Clone for EventSide<P> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            alias: self.alias.clone(),
            payload: Rc::clone(&self.payload),
        }
    }
}

impl<P: ?Sized> fmt::Debug for EventSide<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSide")
            .field("id", &self.id)
            .field("alias", &self.alias)
            .finish_non_exhaustive()
    }
}

/// Passed to every hook of a dispatch. `trigger` is `None` for jumps.
pub struct TriggerEvent<P: ?Sized, T> {
    pub trigger: Option<T>,
    pub from: EventSide<P>,
    pub to: EventSide<P>,
}

impl<P: ?Sized, T: Clone> Clone for TriggerEvent<P, T> {
    fn clone(&self) -> Self {
        Self {
            trigger: self.trigger.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
        }
    }
}

impl<P: ?Sized, T: fmt::Debug> fmt::Debug for TriggerEvent<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerEvent")
            .field("trigger", &self.trigger)
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

impl<P: ?Sized, T> TriggerEvent<P, T> {
    /// Whether the transition leaves and re-enters the same node.
    pub fn is_reentry(&self) -> bool {
        self.from.id == self.to.id
    }
}
