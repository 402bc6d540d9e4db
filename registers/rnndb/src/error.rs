// Licensed under the Apache-2.0 license

//! Located errors raised while reading a register database.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A position inside one of the database's source files.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Location {
    pub file: PathBuf,
    /// 1-based line number.
    pub line: u64,
    /// 1-based column number.
    pub column: u64,
}

impl Location {
    pub fn new(file: &Path, line: u64, column: u64) -> Self {
        Self {
            file: file.to_path_buf(),
            line,
            column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// A fatal structural or resolution error, tagged with where it was found.
///
/// Displays as a single `file:line:column: message` diagnostic line.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{location}: {message}")]
pub struct SchemaError {
    pub location: Location,
    pub message: String,
}

impl SchemaError {
    pub fn new(location: Location, message: impl fmt::Display) -> Self {
        Self {
            location,
            message: message.to_string(),
        }
    }
}

/// Validation failures of a single bitfield, independent of where it was declared.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum FieldError {
    #[error("low attribute out of range: {0}")]
    LowOutOfRange(u32),
    #[error("high attribute out of range: {0}")]
    HighOutOfRange(u32),
    #[error("low is greater than high: low={low}, high={high}")]
    Inverted { low: u32, high: u32 },
    #[error("booleans should be 1 bit fields")]
    BooleanWidth,
    #[error("floats should be 16 or 32 bit fields")]
    FloatWidth,
    #[error("unknown type '{0}'")]
    UnknownType(String),
    #[error("fixed point type '{0}' requires a radix attribute")]
    MissingRadix(String),
    #[error("radix attribute out of range: {0}")]
    RadixOutOfRange(u32),
    #[error("shr attribute out of range: {0}")]
    ShrOutOfRange(u32),
    #[error("value 0x{value:x} has non-zero bits below shr={shr}")]
    ShiftedOutBits { value: u64, shr: u32 },
}

pub type SchemaResult<T> = Result<T, SchemaError>;
