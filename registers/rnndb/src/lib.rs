// Licensed under the Apache-2.0 license

//! Reader for XML register databases.
//!
//! A register database describes hardware registers as nested `domain`,
//! `array`, `reg32`/`reg64`, `bitset`/`bitfield` and `enum` elements, spread
//! over a root file and the files it imports. This crate parses such a file
//! set into a [`Database`] and computes the cross-register [`Index`] used by
//! the header generators.
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use registers_rnndb::{parse_file, Index, ParseConfig};
//!
//! let config = ParseConfig::new("src/freedreno/registers");
//! let db = parse_file(&config, Path::new("src/freedreno/registers/adreno/a6xx.xml")).unwrap();
//! let index = Index::build(&db).unwrap();
//! println!("{} registers, {} variant groups", db.regs.len(), index.variant_groups.len());
//! ```
//!
//! ## Module Organization
//!
//! - [`model`]: Arena based object model ([`Database`], registers, bitsets, arrays)
//! - [`config`]: Parse configuration ([`ParseConfig`])
//! - [`error`]: Located errors ([`SchemaError`])
//! - [`variant`]: Parsing of `variants=` attributes
//! - [`index`]: Variant and usage aggregation ([`Index`])

pub mod config;
pub mod error;
pub mod index;
pub mod model;
pub mod variant;

mod parse;

pub use config::ParseConfig;
pub use error::{FieldError, Location, SchemaError, SchemaResult};
pub use index::Index;
pub use model::Database;
pub use parse::{parse_file, parse_int, parse_str};
