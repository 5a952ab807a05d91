//! Data-driven state trees: describe states and transitions in RON, TOML or
//! JSON and build a [`StateManager`](stagehand_core::manager::StateManager)
//! from the file.

pub mod builder;
pub mod loader;
pub mod schema;

pub use builder::{build_manager, load_manager};
pub use loader::{DataLoadError, Format, deserialize_file, detect_format, load_tree, parse_str};
pub use schema::{StateDef, TransitionDef, TreeDef};
