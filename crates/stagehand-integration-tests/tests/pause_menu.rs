//! Integration test: an in-game pause menu
//!
//! The level is created with `auto_pause`, so starting its pause-menu child
//! pauses it and ending the child resumes it. The state manager drives both
//! moves through transition change callbacks.

use std::rc::Rc;

use stagehand_core::prelude::*;
use stagehand_core::test_utils::{CallLog, RecordingStage, isolated_manager, local_registry};

type Manager = StateManager<dyn Lifecycle, &'static str>;
type Event = TriggerEvent<dyn Lifecycle, &'static str>;

#[test]
fn pause_menu_pauses_and_resumes_its_level() {
    let (mut pool, registry) = local_registry();
    let log = CallLog::default();

    let campaign: Rc<dyn Lifecycle> = LifecycleObject::new(
        &registry,
        "campaign",
        RecordingStage::ready("campaign", "save", &log),
        LifecycleOptions::default(),
    );
    let level: Rc<dyn Lifecycle> = LifecycleObject::new(
        &registry,
        "level",
        RecordingStage::ready("level", "map", &log),
        LifecycleOptions::default()
            .parent(Rc::clone(&campaign))
            .auto_pause(true),
    );
    let pause_menu: Rc<dyn Lifecycle> = LifecycleObject::new(
        &registry,
        "pause_menu",
        RecordingStage::ready("pause_menu", "overlay", &log),
        LifecycleOptions::default().parent(Rc::clone(&level)),
    );

    let mut states: Manager = isolated_manager();
    let level_id = states
        .add(Rc::clone(&level), AddOptions::default().alias("level"))
        .unwrap();
    let pause_id = states
        .add(
            Rc::clone(&pause_menu),
            AddOptions::default().alias("pause_menu").parent(level_id),
        )
        .unwrap();
    let open = |ev: &Event, _: &mut Manager| -> HookResult {
        ev.to.payload.start()?;
        Ok(())
    };
    let close = |ev: &Event, _: &mut Manager| -> HookResult {
        ev.from.payload.end()?;
        Ok(())
    };
    states
        .add_transitions(
            level_id,
            [Transition::relation("escape", Relation::Child).with_change(open)],
        )
        .unwrap();
    states
        .add_transitions(
            pause_id,
            [Transition::relation("escape", Relation::Parent).with_change(close)],
        )
        .unwrap();

    states.set_initial(level_id).unwrap();
    campaign.start().unwrap();
    pool.run_until_stalled();
    level.start().unwrap();
    pool.run_until_stalled();
    assert!(!level.is_paused());

    states.trigger("escape").unwrap();
    pool.run_until_stalled();
    assert_eq!(states.current_id(), Some(pause_id));
    assert!(level.is_paused());
    assert!(pause_menu.is_running());

    states.trigger("escape").unwrap();
    pool.run_until_stalled();
    assert_eq!(states.current_id(), Some(level_id));
    assert!(!level.is_paused());
    assert!(!pause_menu.is_running());
    // Ending clears the registry's current pointer.
    assert!(registry.current().is_none());

    assert_eq!(
        log.entries(),
        vec![
            "campaign:preload",
            "campaign:start:save",
            "level:preload",
            "level:start:map",
            "pause_menu:preload",
            "pause_menu:start:overlay",
            "level:pause",
            "pause_menu:end",
            "level:child_end:pause_menu",
            "level:unpause",
        ]
    );
}

#[test]
fn tutorial_steps_advance_automatically() {
    let (mut pool, registry) = local_registry();
    let log = CallLog::default();

    let tutorial: Rc<dyn Lifecycle> = LifecycleObject::new(
        &registry,
        "tutorial",
        RecordingStage::ready("tutorial", "", &log),
        LifecycleOptions::default().auto_advance(true),
    );
    let steps: Vec<Rc<dyn Lifecycle>> = ["move", "jump", "shoot"]
        .into_iter()
        .map(|name| {
            let step: Rc<dyn Lifecycle> = LifecycleObject::new(
                &registry,
                name,
                RecordingStage::ready(name, "hint", &log),
                LifecycleOptions::default().parent(Rc::clone(&tutorial)),
            );
            step
        })
        .collect();

    tutorial.start().unwrap();
    pool.run_until_stalled();
    assert!(steps[0].is_running());

    for (i, step) in steps.iter().enumerate() {
        assert!(step.is_running(), "step {i} should be running");
        step.end().unwrap();
        pool.run_until_stalled();
    }

    assert!(steps.iter().all(|s| !s.is_running()));
    assert!(tutorial.is_running());
    assert_eq!(log.count("tutorial:child_end:shoot"), 1);
    assert_eq!(log.count("shoot:start:hint"), 1);
}
