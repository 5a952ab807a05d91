//! Integration test: data-defined trees driving lifecycle objects
//!
//! Loads the bundled menu tree from `stagehand-data`, builds one lifecycle
//! object per state (mirroring the state tree's parent links), and lets a
//! post-trigger hook start whichever object the manager moves to. Starting
//! an unrelated object ends the active one, so the log shows the whole
//! replace / nest sequence.

use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use stagehand_core::prelude::*;
use stagehand_core::test_utils::{CallLog, RecordingStage, local_registry};
use stagehand_data::{StateDef, load_manager};

fn bundled_tree() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../stagehand-data/trees/main_menu.toml")
}

#[test]
fn loaded_tree_starts_and_ends_lifecycles() {
    let (mut pool, registry) = local_registry();
    let log = CallLog::default();

    // States are declared parent-first, so a parent's object always exists
    // by the time its children ask for it.
    let mut objects: HashMap<String, Rc<dyn Lifecycle>> = HashMap::new();
    let factory = |def: &StateDef| -> Option<Rc<dyn Lifecycle>> {
        let mut options = LifecycleOptions::default();
        if let Some(StateKey::Alias(parent)) = &def.parent {
            options = options.parent(Rc::clone(objects.get(parent)?));
        }
        let object: Rc<dyn Lifecycle> = LifecycleObject::new(
            &registry,
            def.alias.clone(),
            RecordingStage::ready(&def.alias, &def.kind, &log),
            options,
        );
        objects.insert(def.alias.clone(), Rc::clone(&object));
        Some(object)
    };

    let mut states: StateManager<dyn Lifecycle, String> =
        load_manager(&bundled_tree(), IdSource::new(), factory).unwrap();
    states.set_post_trigger(|ev| {
        ev.to.payload.start()?;
        Ok(())
    });

    states.current().unwrap().start().unwrap();
    pool.run_until_stalled();

    for trigger in ["play", "pause", "resume", "next", "next"] {
        states.trigger(trigger.to_string()).unwrap();
        pool.run_until_stalled();
    }

    assert_eq!(states.current_alias(), Some("menu"));
    assert_eq!(registry.current().unwrap().name(), "menu");
    assert_eq!(
        log.entries(),
        vec![
            "menu:preload",
            "menu:start:menu",
            // menu is level_1's parent, so it stays alive
            "level_1:preload",
            "level_1:start:level",
            "paused:preload",
            "paused:start:pause",
            // back up to level_1: paused is not its ancestor
            "paused:end",
            "level_1:start:level",
            "level_2:preload",
            "level_1:end",
            "level_2:start:level",
            "level_2:end",
            "menu:start:menu",
        ]
    );
}

#[test]
fn unknown_kind_in_factory_aborts_load() {
    let (_pool, registry) = local_registry();
    let log = CallLog::default();
    let factory = |def: &StateDef| -> Option<Rc<dyn Lifecycle>> {
        if def.kind == "pause" {
            return None;
        }
        let object: Rc<dyn Lifecycle> = LifecycleObject::new(
            &registry,
            def.alias.clone(),
            RecordingStage::ready(&def.alias, &def.kind, &log),
            LifecycleOptions::default(),
        );
        Some(object)
    };

    let err = load_manager(&bundled_tree(), IdSource::new(), factory).unwrap_err();
    assert!(matches!(
        err,
        stagehand_data::DataLoadError::UnknownKind { ref alias, .. } if alias == "paused"
    ));
    assert!(log.entries().is_empty());
}
