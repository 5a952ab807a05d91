//! Turn a parsed [`TreeDef`] into a live [`StateManager`].

use std::path::Path;
use std::rc::Rc;

use stagehand_core::id::IdSource;
use stagehand_core::manager::{AddOptions, StateManager};
use stagehand_core::transition::Transition;
use tracing::{debug, info};

use crate::loader::{DataLoadError, load_tree};
use crate::schema::{StateDef, TreeDef};

/// Build a manager from a tree definition.
///
/// `factory` maps each state to its payload, usually by `kind`; returning
/// `None` rejects the state with [`DataLoadError::UnknownKind`]. Every
/// transition and kind is validated before the first node is created, so a
/// bad definition never leaves ids allocated from `ids`.
pub fn build_manager<P, F>(
    def: &TreeDef,
    ids: IdSource,
    mut factory: F,
) -> Result<StateManager<P, String>, DataLoadError>
where
    P: ?Sized,
    F: FnMut(&StateDef) -> Option<Rc<P>>,
{
    let mut transitions: Vec<Vec<Transition<P, String>>> = Vec::with_capacity(def.states.len());
    for state in &def.states {
        let list = state
            .transitions
            .iter()
            .map(|t| t.to_transition(&state.alias))
            .collect::<Result<Vec<_>, _>>()?;
        transitions.push(list);
    }

    let mut payloads = Vec::with_capacity(def.states.len());
    for state in &def.states {
        let payload = factory(state).ok_or_else(|| DataLoadError::UnknownKind {
            alias: state.alias.clone(),
            kind: state.kind.clone(),
        })?;
        payloads.push(payload);
    }

    let mut manager = StateManager::with_ids(ids);
    let mut added = Vec::with_capacity(def.states.len());
    for (state, payload) in def.states.iter().zip(payloads) {
        let mut options = AddOptions::default().alias(state.alias.clone());
        if let Some(parent) = &state.parent {
            options = options.parent(parent.clone());
        }
        let id = manager.add(payload, options)?;
        debug!(alias = %state.alias, kind = %state.kind, %id, "state loaded");
        added.push(id);
    }

    // Transitions go in once every state exists so they may point forward.
    for (id, list) in added.into_iter().zip(transitions) {
        manager.add_transitions(id, list)?;
    }

    if let Some(initial) = &def.initial {
        manager.set_initial(initial.clone())?;
    }

    info!(
        states = manager.len(),
        initial = ?def.initial,
        "state tree built"
    );
    Ok(manager)
}

/// Load a definition file and build it in one step.
pub fn load_manager<P, F>(
    path: &Path,
    ids: IdSource,
    factory: F,
) -> Result<StateManager<P, String>, DataLoadError>
where
    P: ?Sized,
    F: FnMut(&StateDef) -> Option<Rc<P>>,
{
    let def = load_tree(path)?;
    build_manager(&def, ids, factory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TransitionDef;
    use stagehand_core::error::StateError;
    use stagehand_core::id::{StateId, StateKey};
    use stagehand_core::transition::Relation;

    fn state(alias: &str, kind: &str, parent: Option<&str>) -> StateDef {
        StateDef {
            alias: alias.to_string(),
            kind: kind.to_string(),
            parent: parent.map(StateKey::from),
            transitions: Vec::new(),
        }
    }

    fn on(trigger: &str, relation: Relation) -> TransitionDef {
        TransitionDef {
            trigger: Some(trigger.to_string()),
            to: None,
            relation: Some(relation),
        }
    }

    fn kind_payload(def: &StateDef) -> Option<Rc<str>> {
        match def.kind.as_str() {
            "menu" | "level" | "pause" => Some(Rc::from(def.kind.as_str())),
            _ => None,
        }
    }

    fn menu_tree() -> TreeDef {
        let mut menu = state("menu", "menu", None);
        menu.transitions.push(on("play", Relation::Child));
        let mut l1 = state("level_1", "level", Some("menu"));
        l1.transitions.push(on("next", Relation::SiblingElseUp));
        let mut l2 = state("level_2", "level", Some("menu"));
        l2.transitions.push(on("next", Relation::SiblingElseUp));
        TreeDef {
            initial: Some(StateKey::from("menu")),
            states: vec![menu, l1, l2],
        }
    }

    #[test]
    fn builds_and_dispatches() {
        let mut m = build_manager(&menu_tree(), IdSource::new(), kind_payload).unwrap();
        assert_eq!(m.len(), 3);
        assert_eq!(m.current_alias(), Some("menu"));
        assert_eq!(m.parent_of("level_2").unwrap(), StateId(0));

        m.trigger("play".to_string()).unwrap();
        assert_eq!(m.current_alias(), Some("level_1"));
        m.trigger("next".to_string()).unwrap();
        assert_eq!(m.current_alias(), Some("level_2"));
        m.trigger("next".to_string()).unwrap();
        assert_eq!(m.current_alias(), Some("menu"));
    }

    #[test]
    fn unknown_kind_allocates_nothing() {
        let mut tree = menu_tree();
        tree.states.push(state("shop", "shop", None));
        let ids = IdSource::new();

        let err = build_manager(&tree, ids.clone(), kind_payload).unwrap_err();
        match err {
            DataLoadError::UnknownKind { alias, kind } => {
                assert_eq!(alias, "shop");
                assert_eq!(kind, "shop");
            }
            other => panic!("expected UnknownKind, got {other:?}"),
        }
        assert_eq!(ids.peek(), StateId(0));
    }

    #[test]
    fn invalid_transition_rejected_before_build() {
        let mut tree = menu_tree();
        tree.states[1].transitions.push(TransitionDef {
            trigger: None,
            to: None,
            relation: None,
        });
        let ids = IdSource::new();
        let err = build_manager(&tree, ids.clone(), kind_payload).unwrap_err();
        assert!(matches!(err, DataLoadError::InvalidTransition { ref state, .. } if state == "level_1"));
        assert_eq!(ids.peek(), StateId(0));
    }

    #[test]
    fn parent_must_be_declared_first() {
        let tree = TreeDef {
            initial: None,
            states: vec![state("level_1", "level", Some("menu")), state("menu", "menu", None)],
        };
        let err = build_manager(&tree, IdSource::new(), kind_payload).unwrap_err();
        assert!(matches!(
            err,
            DataLoadError::State(StateError::NoSuchState(StateKey::Alias(ref a))) if a == "menu"
        ));
    }

    #[test]
    fn duplicate_alias_surfaces_state_error() {
        let tree = TreeDef {
            initial: None,
            states: vec![state("menu", "menu", None), state("menu", "pause", None)],
        };
        let err = build_manager(&tree, IdSource::new(), kind_payload).unwrap_err();
        assert!(matches!(err, DataLoadError::State(StateError::DuplicateAlias(_))));
    }

    #[test]
    fn missing_initial_leaves_manager_uninitialised() {
        let mut tree = menu_tree();
        tree.initial = None;
        let m = build_manager(&tree, IdSource::new(), kind_payload).unwrap();
        assert!(m.current().is_none());
    }

    #[test]
    fn forward_references_in_transitions() {
        let mut menu = state("menu", "menu", None);
        menu.transitions.push(TransitionDef {
            trigger: Some("pause".into()),
            to: Some(StateKey::from("paused")),
            relation: None,
        });
        let tree = TreeDef {
            initial: Some(StateKey::from("menu")),
            states: vec![menu, state("paused", "pause", None)],
        };
        let mut m = build_manager(&tree, IdSource::new(), kind_payload).unwrap();
        m.trigger("pause".to_string()).unwrap();
        assert_eq!(m.current_alias(), Some("paused"));
    }
}
