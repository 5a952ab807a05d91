//! Menu flow example: a data-defined menu tree driving lifecycle objects.
//!
//! Loads `trees/main_menu.ron` from `stagehand-data`, gives every state a
//! lifecycle object that "loads" its assets asynchronously, and plays a
//! short session: into the first level, pause, resume, through the second
//! level and back to the menu.
//!
//! Run with: `RUST_LOG=debug cargo run -p stagehand-examples --example menu_flow`

use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use futures::executor::LocalPool;
use futures::future::{FutureExt, LocalBoxFuture};
use stagehand_core::prelude::*;
use stagehand_data::{StateDef, load_manager};
use tracing_subscriber::EnvFilter;

/// A screen whose assets are a list of file names.
struct Screen {
    name: String,
    kind: String,
}

impl Stage for Screen {
    type Data = Vec<String>;

    fn preload(&self) -> LocalBoxFuture<'static, Vec<String>> {
        let kind = self.kind.clone();
        async move {
            match kind.as_str() {
                "level" => vec!["tiles.png".into(), "music.ogg".into()],
                "menu" => vec!["logo.png".into()],
                _ => Vec::new(),
            }
        }
        .boxed_local()
    }

    fn on_start(&self, assets: &Vec<String>) {
        println!("  [{}] start with {} asset(s): {assets:?}", self.name, assets.len());
    }

    fn on_pause(&self) {
        println!("  [{}] paused", self.name);
    }

    fn on_unpause(&self) {
        println!("  [{}] resumed", self.name);
    }

    fn on_end(&self) {
        println!("  [{}] end", self.name);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut pool = LocalPool::new();
    let registry = LifecycleRegistry::with_hooks(
        pool.spawner(),
        LifecycleHooks::default().on_start(|object| println!("-> now running: {}", object.name())),
    );

    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../stagehand-data/trees/main_menu.ron");

    // Lifecycle parents mirror the state tree. Levels pause while their
    // pause screen is up.
    let mut objects: HashMap<String, Rc<dyn Lifecycle>> = HashMap::new();
    let factory = |def: &StateDef| -> Option<Rc<dyn Lifecycle>> {
        let mut options = LifecycleOptions::default().auto_pause(def.kind == "level");
        if let Some(StateKey::Alias(parent)) = &def.parent {
            options = options.parent(Rc::clone(objects.get(parent)?));
        }
        let screen = Screen {
            name: def.alias.clone(),
            kind: def.kind.clone(),
        };
        let object: Rc<dyn Lifecycle> =
            LifecycleObject::new(&registry, def.alias.clone(), screen, options);
        objects.insert(def.alias.clone(), Rc::clone(&object));
        Some(object)
    };

    let mut states: StateManager<dyn Lifecycle, String> =
        load_manager(&path, IdSource::new(), factory)?;
    println!("loaded {} states from {}", states.len(), path.display());

    // Moving up the tree ends the state being left, so a level resumes when
    // its pause screen closes. The destination is then (re)started so it
    // becomes the registry's current object again.
    states.set_post_trigger(|ev| {
        if ev.to.payload.is_ancestor_of(&*ev.from.payload) {
            ev.from.payload.end()?;
        }
        ev.to.payload.start()?;
        Ok(())
    });

    if let Some(menu) = states.current() {
        menu.start()?;
    }
    pool.run_until_stalled();

    for trigger in ["play", "pause", "resume", "next", "next", "options", "back"] {
        println!("\ntrigger '{trigger}'");
        match states.trigger(trigger.to_string()) {
            Ok(Some(id)) => println!("state -> {} ({id})", states.current_alias().unwrap_or("?")),
            Ok(None) => println!("trigger ignored"),
            Err(err) => println!("trigger rejected: {err}"),
        }
        pool.run_until_stalled();
    }

    Ok(())
}
