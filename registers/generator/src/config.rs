// Licensed under the Apache-2.0 license

//! Configuration for header generation.
//!
//! [`OutputMode`] selects the backend, and [`GeneratorConfig`] carries it
//! together with the schema root that source file names in the generated
//! header comment are shown relative to.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use registers_generator::config::{GeneratorConfig, OutputMode};
//!
//! let config = GeneratorConfig::new(OutputMode::CPackStructs).schema_root("registers");
//! assert_eq!(config.mode.guard(Path::new("a6xx.xml")), "A6XX_XML_STRUCTS");
//! ```

use crate::util::guard_name;
use std::fmt;
use std::path::{Path, PathBuf};

/// The kind of file to generate.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum OutputMode {
    /// Address macros, field encoders and usage tables for C.
    #[default]
    CDefines,
    /// Everything in [`OutputMode::CDefines`] plus register value structs,
    /// pack builders and variant dispatchers.
    CPackStructs,
    /// Register offsets as a Python `IntEnum`.
    PyDefines,
}

impl OutputMode {
    /// Include guard of a C header generated from `root_file`.
    pub fn guard(&self, root_file: &Path) -> String {
        let guard = guard_name(root_file);
        match self {
            OutputMode::CPackStructs => format!("{guard}_STRUCTS"),
            _ => guard,
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputMode::CDefines => "c-defines",
            OutputMode::CPackStructs => "c-pack-structs",
            OutputMode::PyDefines => "py-defines",
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct GeneratorConfig {
    pub mode: OutputMode,

    /// Directory that source file names in the header comment are relative to.
    pub schema_root: PathBuf,
}

impl GeneratorConfig {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            schema_root: PathBuf::new(),
        }
    }

    pub fn schema_root(mut self, schema_root: impl Into<PathBuf>) -> Self {
        self.schema_root = schema_root.into();
        self
    }

    /// Shortens a source file path for display in the header comment.
    pub fn display_path(&self, file: &Path) -> String {
        file.strip_prefix(&self.schema_root)
            .unwrap_or(file)
            .display()
            .to_string()
    }
}
