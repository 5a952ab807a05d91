//! The node store: identity, aliases, parent/child links and enumeration.
//!
//! Nodes are kept in creation order. Ids come from a shared [`IdSource`], so
//! two trees built from the same source never hand out the same id. Payloads
//! are held by `Rc` and compared by pointer: one payload may sit in several
//! nodes, which [`Topology::count`] and [`Topology::is_unique`] report.
//!
//! Every enumeration borrows the store and walks it afresh on each call.
//! [`Topology::ancestors`] has no cycle guard; callers must not build cycles.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::error::StateError;
use crate::id::{IdSource, StateId, StateKey};

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// One slot in the tree.
pub struct Node<P: ?Sized> {
    pub id: StateId,
    pub alias: Option<String>,
    pub payload: Rc<P>,
    pub parent: Option<StateId>,
    /// Child ids in insertion order.
    pub children: Vec<StateId>,
}

impl<P: ?Sized> fmt::Debug for Node<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("alias", &self.alias)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

/// A child to append: an existing node, or a payload that gets a new node.
pub enum Child<P: ?Sized> {
    Existing(StateKey),
    New(Rc<P>),
}

impl<P: ?Sized> fmt::Debug for Child<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Child::Existing(key) => write!(f, "Existing({key})"),
            Child::New(_) => write!(f, "New(<payload>)"),
        }
    }
}

impl<P: ?Sized> From<Rc<P>> for Child<P> {
    fn from(payload: Rc<P>) -> Self {
        Child::New(payload)
    }
}

impl<P: ?Sized> From<StateId> for Child<P> {
    fn from(id: StateId) -> Self {
        Child::Existing(id.into())
    }
}

impl<P: ?Sized> From<&str> for Child<P> {
    fn from(alias: &str) -> Self {
        Child::Existing(alias.into())
    }
}

impl<P: ?Sized> From<StateKey> for Child<P> {
    fn from(key: StateKey) -> Self {
        Child::Existing(key)
    }
}

// ---------------------------------------------------------------------------
// Topology
// ---------------------------------------------------------------------------

/// The tree of nodes.
pub struct Topology<P: ?Sized> {
    ids: IdSource,
    /// Creation order.
    nodes: Vec<Node<P>>,
    index: HashMap<StateId, usize>,
    aliases: HashMap<String, StateId>,
}

impl<P: ?Sized> fmt::Debug for Topology<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Topology")
            .field("nodes", &self.nodes)
            .field("aliases", &self.aliases)
            .finish_non_exhaustive()
    }
}

impl<P: ?Sized> Topology<P> {
    /// Create an empty tree drawing ids from `ids`.
    pub fn new(ids: IdSource) -> Self {
        Self {
            ids,
            nodes: Vec::new(),
            index: HashMap::new(),
            aliases: HashMap::new(),
        }
    }

    // -- Resolution ---------------------------------------------------------

    /// Resolve a key to an id, or `None` if it names nothing in this tree.
    pub fn try_resolve(&self, key: &StateKey) -> Option<StateId> {
        match key {
            StateKey::Id(id) => self.index.contains_key(id).then_some(*id),
            StateKey::Alias(alias) => self.aliases.get(alias).copied(),
        }
    }

    /// Resolve a key to an id.
    pub fn resolve(&self, key: &StateKey) -> Result<StateId, StateError> {
        self.try_resolve(key)
            .ok_or_else(|| StateError::NoSuchState(key.clone()))
    }

    /// Look up a node by id.
    pub fn node(&self, id: StateId) -> Option<&Node<P>> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    fn node_mut(&mut self, id: StateId) -> Option<&mut Node<P>> {
        self.index.get(&id).map(|&i| &mut self.nodes[i])
    }

    /// Look up a node by key.
    pub fn get(&self, key: &StateKey) -> Result<&Node<P>, StateError> {
        let id = self.resolve(key)?;
        self.node(id)
            .ok_or_else(|| StateError::NoSuchState(key.clone()))
    }

    // -- Mutation -----------------------------------------------------------

    /// Create a parentless node. Fails without allocating an id if the
    /// alias is already taken.
    pub fn insert(&mut self, payload: Rc<P>, alias: Option<String>) -> Result<StateId, StateError> {
        if let Some(alias) = &alias
            && self.aliases.contains_key(alias)
        {
            return Err(StateError::DuplicateAlias(alias.clone()));
        }

        let id = self.ids.next_id();
        if let Some(alias) = &alias {
            self.aliases.insert(alias.clone(), id);
        }
        self.index.insert(id, self.nodes.len());
        self.nodes.push(Node {
            id,
            alias,
            payload,
            parent: None,
            children: Vec::new(),
        });
        debug!(state = %id, "state added");
        Ok(id)
    }

    /// Move `child` under `parent`: detach it from its current parent's
    /// children (if any), append it to the new parent's, update its link.
    pub fn set_parent(&mut self, child: &StateKey, parent: &StateKey) -> Result<(), StateError> {
        let child_id = self.resolve(child)?;
        let parent_id = self.resolve(parent)?;

        if let Some(old) = self.node(child_id).and_then(|n| n.parent)
            && let Some(old_parent) = self.node_mut(old)
        {
            old_parent.children.retain(|&c| c != child_id);
        }
        if let Some(new_parent) = self.node_mut(parent_id) {
            new_parent.children.push(child_id);
        }
        if let Some(node) = self.node_mut(child_id) {
            node.parent = Some(parent_id);
        }
        debug!(state = %child_id, parent = %parent_id, "state reparented");
        Ok(())
    }

    /// Append one child under `parent`. A [`Child::New`] payload gets a fresh
    /// node; a [`Child::Existing`] node is moved with [`set_parent`](Self::set_parent).
    pub fn append_child(&mut self, parent: &StateKey, child: Child<P>) -> Result<StateId, StateError> {
        let parent_id = self.resolve(parent)?;
        let child_id = match child {
            Child::New(payload) => self.insert(payload, None)?,
            Child::Existing(key) => self.resolve(&key)?,
        };
        self.set_parent(&child_id.into(), &parent_id.into())?;
        Ok(child_id)
    }

    // -- Lookup -------------------------------------------------------------

    /// The payload at `key`.
    pub fn at(&self, key: &StateKey) -> Result<&Rc<P>, StateError> {
        self.get(key).map(|n| &n.payload)
    }

    /// The alias registered for `key`, if any.
    pub fn alias_at(&self, key: &StateKey) -> Result<Option<&str>, StateError> {
        self.get(key).map(|n| n.alias.as_deref())
    }

    /// Whether `key` names a node. Never fails.
    pub fn has(&self, key: &StateKey) -> bool {
        self.try_resolve(key).is_some()
    }

    pub fn has_children(&self, key: &StateKey) -> Result<bool, StateError> {
        self.get(key).map(|n| !n.children.is_empty())
    }

    /// The parent id of `key`. Fails with `NoParent` on a root.
    pub fn parent_of(&self, key: &StateKey) -> Result<StateId, StateError> {
        let node = self.get(key)?;
        node.parent.ok_or(StateError::NoParent(node.id))
    }

    // -- Enumeration --------------------------------------------------------

    /// Node ids in creation order.
    pub fn keys(&self) -> impl Iterator<Item = StateId> + '_ {
        self.nodes.iter().map(|n| n.id)
    }

    /// Payloads in creation order.
    pub fn values(&self) -> impl Iterator<Item = &Rc<P>> + '_ {
        self.nodes.iter().map(|n| &n.payload)
    }

    /// `(id, payload)` pairs in creation order.
    pub fn entries(&self) -> impl Iterator<Item = (StateId, &Rc<P>)> + '_ {
        self.nodes.iter().map(|n| (n.id, &n.payload))
    }

    /// `(id, payload)` pairs for the children of `key`, in sibling order.
    pub fn children(
        &self,
        key: &StateKey,
    ) -> Result<impl Iterator<Item = (StateId, &Rc<P>)> + use<'_, P>, StateError> {
        let node = self.get(key)?;
        Ok(self.pairs(&node.children))
    }

    /// `(id, payload)` pairs for every other child of `key`'s parent.
    pub fn siblings(
        &self,
        key: &StateKey,
    ) -> Result<impl Iterator<Item = (StateId, &Rc<P>)> + use<'_, P>, StateError> {
        let node = self.get(key)?;
        let own = node.id;
        let parent = node.parent.ok_or(StateError::NoParent(own))?;
        let siblings = self.node(parent).map(|p| p.children.as_slice()).unwrap_or(&[]);
        Ok(self.pairs(siblings).filter(move |(id, _)| *id != own))
    }

    /// Walk from `key` up to its root. The node itself comes first unless
    /// `strict` is set.
    pub fn ancestors(&self, key: &StateKey, strict: bool) -> Result<Ancestors<'_, P>, StateError> {
        let node = self.get(key)?;
        let next = if strict { node.parent } else { Some(node.id) };
        Ok(Ancestors {
            topology: self,
            next,
        })
    }

    fn pairs<'a>(&'a self, ids: &'a [StateId]) -> impl Iterator<Item = (StateId, &'a Rc<P>)> + 'a {
        ids.iter()
            .filter_map(move |&id| self.node(id).map(|n| (n.id, &n.payload)))
    }

    // -- Multiplicity -------------------------------------------------------

    /// How many nodes hold this exact payload (pointer identity).
    pub fn count(&self, payload: &Rc<P>) -> usize {
        self.nodes
            .iter()
            .filter(|n| Rc::ptr_eq(&n.payload, payload))
            .count()
    }

    /// Whether exactly one node holds this payload.
    pub fn is_unique(&self, payload: &Rc<P>) -> bool {
        self.count(payload) == 1
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Iterator over a node and its ancestors, see [`Topology::ancestors`].
pub struct Ancestors<'a, P: ?Sized> {
    topology: &'a Topology<P>,
    next: Option<StateId>,
}

impl<'a, P: ?Sized> Iterator for Ancestors<'a, P> {
    type Item = (StateId, &'a Rc<P>);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.topology.node(self.next?)?;
        self.next = node.parent;
        Some((node.id, &node.payload))
    }
}
