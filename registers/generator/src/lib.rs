// Licensed under the Apache-2.0 license

//! Header generator for XML register databases.
//!
//! This crate turns a parsed register database into source text: a flat C
//! header of address macros and field encoders, the same header extended
//! with struct based register packing, or a Python mirror of the register
//! offsets.
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use registers_generator::{generate_from_file, GeneratorConfig, OutputMode};
//! use registers_rnndb::ParseConfig;
//!
//! let parse_config = ParseConfig::new("src/freedreno/registers");
//! let config = GeneratorConfig::new(OutputMode::CPackStructs)
//!     .schema_root("src/freedreno/registers");
//! let header = generate_from_file(
//!     &parse_config,
//!     &config,
//!     Path::new("src/freedreno/registers/adreno/a6xx.xml"),
//! )
//! .unwrap();
//! print!("{header}");
//! ```
//!
//! ## Module Organization
//!
//! - [`util`]: Alignment, hex formatting and C spelling helpers
//! - [`config`]: Output selection ([`OutputMode`], [`GeneratorConfig`])
//! - [`c_defines`]: Address macros, field encoders and usage tables
//! - [`pack_structs`]: Register value structs, builders and variant dispatchers
//! - [`py_defines`]: Python offset constants

pub mod c_defines;
pub mod config;
pub mod pack_structs;
pub mod py_defines;
pub mod util;

pub use config::{GeneratorConfig, OutputMode};

use log::debug;
use registers_rnndb::{parse_file, Database, Index, ParseConfig};
use std::fmt::Write;
use std::path::Path;

/// Parse `file` with its imports and generate the requested output.
///
/// Nothing is generated unless the whole database parses and aggregates
/// without error.
pub fn generate_from_file(
    parse_config: &ParseConfig,
    config: &GeneratorConfig,
    file: &Path,
) -> anyhow::Result<String> {
    let db = parse_file(parse_config, file)?;
    let index = Index::build(&db)?;
    debug!(
        "{}: {} registers, {} variant groups, {} usage tables",
        file.display(),
        db.regs.len(),
        index.variant_groups.len(),
        index.usage_tables.len()
    );
    Ok(generate(&db, &index, config))
}

/// Generate output from an already parsed database.
pub fn generate(db: &Database, index: &Index, config: &GeneratorConfig) -> String {
    let root_file = db.files.first().map(|f| f.as_path()).unwrap_or(Path::new(""));
    let mut output = String::new();
    if config.mode == OutputMode::PyDefines {
        py_defines::write_py_defines(&mut output, db, root_file);
        return output;
    }

    let guard = config.mode.guard(root_file);
    writeln!(output, "#ifndef {guard}").unwrap();
    writeln!(output, "#define {guard}").unwrap();
    writeln!(output).unwrap();
    c_defines::write_header_comment(&mut output, db, config);
    c_defines::write_declarations(&mut output, db);
    c_defines::write_usage_tables(&mut output, db, index);
    if config.mode == OutputMode::CPackStructs {
        pack_structs::write_pack_structs(&mut output, db, index);
    }
    writeln!(output, "#endif /* {guard} */").unwrap();
    output
}
