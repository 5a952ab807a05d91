use serde::{Deserialize, Serialize};

use stagehand_core::id::StateKey;
use stagehand_core::transition::{Relation, Transition};

use crate::loader::DataLoadError;

/// A whole state tree as written in a data file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeDef {
    /// The state to start in. Left uninitialised when absent.
    #[serde(default)]
    pub initial: Option<StateKey>,
    /// States in creation order. Parents must appear before their children.
    pub states: Vec<StateDef>,
}

/// One state. `kind` selects the payload from the caller's factory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDef {
    pub alias: String,
    pub kind: String,
    #[serde(default)]
    pub parent: Option<StateKey>,
    #[serde(default)]
    pub transitions: Vec<TransitionDef>,
}

/// One transition. Exactly one of `to` and `relation` must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionDef {
    #[serde(default)]
    pub trigger: Option<String>,
    #[serde(default)]
    pub to: Option<StateKey>,
    #[serde(default)]
    pub relation: Option<Relation>,
}

impl TransitionDef {
    /// Convert into a runtime transition. `state` names the owning state in errors.
    pub fn to_transition<P: ?Sized>(&self, state: &str) -> Result<Transition<P, String>, DataLoadError> {
        match (&self.to, self.relation) {
            (Some(key), None) => Ok(Transition::to(self.trigger.clone(), key.clone())),
            (None, Some(relation)) => Ok(Transition::relation(self.trigger.clone(), relation)),
            (Some(_), Some(_)) => Err(DataLoadError::InvalidTransition {
                state: state.to_string(),
                detail: "both 'to' and 'relation' are set",
            }),
            (None, None) => Err(DataLoadError::InvalidTransition {
                state: state.to_string(),
                detail: "neither 'to' nor 'relation' is set",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand_core::id::StateId;
    use stagehand_core::transition::Target;

    #[test]
    fn deserialize_ron_tree() {
        let input = r#"(
            initial: Some("menu"),
            states: [
                (
                    alias: "menu",
                    kind: "menu",
                    transitions: [
                        (trigger: Some("play"), relation: Some(child)),
                        (trigger: Some("credits"), to: Some("credits")),
                    ],
                ),
                (alias: "level_1", kind: "level", parent: Some("menu")),
                (alias: "credits", kind: "credits", parent: Some(0)),
            ],
        )"#;

        let tree: TreeDef = ron::from_str(input).unwrap();
        assert_eq!(tree.initial, Some(StateKey::from("menu")));
        assert_eq!(tree.states.len(), 3);
        assert_eq!(tree.states[0].transitions.len(), 2);
        assert_eq!(tree.states[0].transitions[0].relation, Some(Relation::Child));
        assert_eq!(tree.states[1].parent, Some(StateKey::from("menu")));
        assert_eq!(tree.states[2].parent, Some(StateKey::Id(StateId(0))));
    }

    #[test]
    fn deserialize_toml_tree() {
        let input = r#"
            initial = "menu"

            [[states]]
            alias = "menu"
            kind = "menu"

            [[states.transitions]]
            trigger = "play"
            relation = "sibling_else_up"

            [[states]]
            alias = "level_1"
            kind = "level"
            parent = "menu"
        "#;

        let tree: TreeDef = toml::from_str(input).unwrap();
        assert_eq!(tree.states.len(), 2);
        assert_eq!(
            tree.states[0].transitions[0].relation,
            Some(Relation::SiblingElseUp)
        );
        assert!(tree.states[1].transitions.is_empty());
    }

    #[test]
    fn transition_def_requires_exactly_one_target() {
        let both = TransitionDef {
            trigger: Some("go".into()),
            to: Some("x".into()),
            relation: Some(Relation::Parent),
        };
        let neither = TransitionDef {
            trigger: Some("go".into()),
            to: None,
            relation: None,
        };
        assert!(matches!(
            both.to_transition::<str>("menu"),
            Err(DataLoadError::InvalidTransition { .. })
        ));
        assert!(matches!(
            neither.to_transition::<str>("menu"),
            Err(DataLoadError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn transition_def_converts() {
        let def = TransitionDef {
            trigger: None,
            to: Some(StateKey::from("menu")),
            relation: None,
        };
        let t = def.to_transition::<str>("level").unwrap();
        assert_eq!(t.trigger, None);
        assert!(matches!(t.target, Target::ById(StateKey::Alias(ref a)) if a == "menu"));
    }
}
