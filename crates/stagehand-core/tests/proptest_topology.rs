//! Property-based tests for the state tree.
//!
//! Generates random build sequences (adds, reparents, shared payloads) and
//! checks the structural invariants of the topology store.

use std::rc::Rc;

use proptest::prelude::*;
use stagehand_core::prelude::*;
use stagehand_core::test_utils::isolated_manager;

type Manager = StateManager<str, u8>;

/// Build operations applied in order to an initially empty manager.
#[derive(Debug, Clone)]
enum BuildOp {
    /// Add a node holding payload `n` from a small pool, optionally under
    /// the node at index `parent` (modulo the current node count).
    Add { payload: usize, parent: Option<usize> },
    /// Reparent node `child` under node `parent`, when that cannot form a cycle.
    Reparent { child: usize, parent: usize },
}

fn arb_ops(max_ops: usize) -> impl Strategy<Value = Vec<BuildOp>> {
    proptest::collection::vec(
        prop_oneof![
            3 => (0..4usize, proptest::option::of(0..64usize))
                .prop_map(|(payload, parent)| BuildOp::Add { payload, parent }),
            1 => (0..64usize, 0..64usize)
                .prop_map(|(child, parent)| BuildOp::Reparent { child, parent }),
        ],
        1..=max_ops,
    )
}

fn build(ops: &[BuildOp]) -> (Manager, Vec<Rc<str>>, Vec<StateId>) {
    let pool: Vec<Rc<str>> = ["menu", "level", "pause", "credits"]
        .into_iter()
        .map(Rc::from)
        .collect();
    let mut m: Manager = isolated_manager();
    let mut ids: Vec<StateId> = Vec::new();

    for op in ops {
        match *op {
            BuildOp::Add { payload, parent } => {
                let mut options = AddOptions::default();
                if let (Some(p), false) = (parent, ids.is_empty()) {
                    options = options.parent(ids[p % ids.len()]);
                }
                let id = m.add(Rc::clone(&pool[payload]), options).unwrap();
                ids.push(id);
            }
            BuildOp::Reparent { child, parent } => {
                if ids.is_empty() {
                    continue;
                }
                let child = ids[child % ids.len()];
                let parent = ids[parent % ids.len()];
                // Skip moves that would put a node under itself or a descendant.
                let would_cycle = m
                    .ancestors(parent, false)
                    .unwrap()
                    .any(|(id, _)| id == child);
                if !would_cycle {
                    m.set_parent(child, parent).unwrap();
                }
            }
        }
    }
    (m, pool, ids)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every added node is reachable by id and returns its own payload.
    #[test]
    fn every_added_node_is_reachable(ops in arb_ops(40)) {
        let (m, _, ids) = build(&ops);
        prop_assert_eq!(m.len(), ids.len());
        for (id, payload) in m.entries() {
            prop_assert!(m.has(id));
            prop_assert!(Rc::ptr_eq(m.at(id).unwrap(), payload));
        }
        let keys: Vec<StateId> = m.keys().collect();
        prop_assert_eq!(keys, ids);
    }

    /// count(p) equals the number of adds of p; is_unique iff count == 1.
    #[test]
    fn count_matches_number_of_adds(ops in arb_ops(40)) {
        let (m, pool, _) = build(&ops);
        for (i, payload) in pool.iter().enumerate() {
            let adds = ops
                .iter()
                .filter(|op| matches!(op, BuildOp::Add { payload: p, .. } if *p == i))
                .count();
            prop_assert_eq!(m.count(payload), adds);
            prop_assert_eq!(m.is_unique(payload), adds == 1);
        }
    }

    /// Ancestors start at the node (unless strict) and end at a root.
    #[test]
    fn ancestors_walk_to_a_root(ops in arb_ops(40)) {
        let (m, _, ids) = build(&ops);
        for &id in &ids {
            let chain: Vec<StateId> = m.ancestors(id, false).unwrap().map(|(a, _)| a).collect();
            prop_assert_eq!(chain[0], id);
            let root = *chain.last().unwrap();
            prop_assert!(matches!(m.parent_of(root), Err(StateError::NoParent(_))));

            let strict: Vec<StateId> = m.ancestors(id, true).unwrap().map(|(a, _)| a).collect();
            prop_assert_eq!(&strict[..], &chain[1..]);
        }
    }

    /// Parent and child links always agree, and each node has at most one parent.
    #[test]
    fn parent_and_children_links_agree(ops in arb_ops(40)) {
        let (m, _, ids) = build(&ops);
        let mut seen_as_child = std::collections::HashSet::new();
        for &id in &ids {
            for (child, _) in m.children(id).unwrap() {
                prop_assert_eq!(m.parent_of(child).unwrap(), id);
                prop_assert!(seen_as_child.insert(child), "{:?} listed under two parents", child);
            }
            if let Ok(parent) = m.parent_of(id) {
                prop_assert!(m.children(parent).unwrap().any(|(c, _)| c == id));
            }
        }
    }
}
