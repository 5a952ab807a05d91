//! Format detection and deserialization for state tree definitions.
//!
//! Definitions may be written as RON, TOML or JSON; the format is chosen by
//! file extension.

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

use stagehand_core::error::StateError;

use crate::schema::TreeDef;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur while loading or building a state tree definition.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// The payload factory does not know a state's kind.
    #[error("state '{alias}' has unknown kind '{kind}'")]
    UnknownKind { alias: String, kind: String },

    /// A transition names zero or two destinations.
    #[error("invalid transition on state '{state}': {detail}")]
    InvalidTransition { state: String, detail: &'static str },

    /// Building the tree failed.
    #[error(transparent)]
    State(#[from] StateError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported definition formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Deserialize `content` in the given format. `origin` names the source in
/// parse errors.
pub fn parse_str<T: DeserializeOwned>(
    format: Format,
    content: &str,
    origin: &Path,
) -> Result<T, DataLoadError> {
    let parse_error = |detail: String| DataLoadError::Parse {
        file: origin.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string())),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    parse_str(format, &content, path)
}

/// Load a [`TreeDef`] from a `.ron`, `.toml` or `.json` file.
pub fn load_tree(path: &Path) -> Result<TreeDef, DataLoadError> {
    deserialize_file(path)
}

// ===========================================================================
// Tests
// ===========================================================================
