// Licensed under the Apache-2.0 license

//! Configuration for reading a register database.
//!
//! [`ParseConfig`] names the schema root that `<import file="..."/>` paths
//! are resolved against, and whether the optional structural validation
//! step is requested.
//!
//! # Example
//!
//! ```
//! use registers_rnndb::ParseConfig;
//!
//! let config = ParseConfig::new("src/freedreno/registers").validate(true);
//! assert!(config.validate);
//! ```

use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default)]
pub struct ParseConfig {
    /// Directory that import paths are relative to.
    pub schema_root: PathBuf,

    /// Look up the schema referenced by `xsi:schemaLocation` and validate
    /// against it when possible.
    pub validate: bool,
}

impl ParseConfig {
    pub fn new(schema_root: impl Into<PathBuf>) -> Self {
        Self {
            schema_root: schema_root.into(),
            validate: false,
        }
    }

    /// Set whether structural validation is requested.
    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Resolve an import path, falling back to one directory above the
    /// schema root.
    pub fn resolve_import(&self, file: &str) -> Option<PathBuf> {
        let candidate = self.schema_root.join(file);
        if candidate.exists() {
            return Some(candidate);
        }
        let fallback = self.schema_root.join("..").join(file);
        fallback.exists().then_some(fallback)
    }
}

/// Locate a schema file named relative to the file that references it, or
/// one directory up.
pub fn resolve_schema(referencing_file: &Path, schema: &str) -> Option<PathBuf> {
    let dir = referencing_file.parent().unwrap_or(Path::new(""));
    [dir.join(schema), dir.join("..").join(schema)]
        .into_iter()
        .find(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_resolve_import() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("registers");
        fs::create_dir_all(root.join("adreno")).unwrap();
        fs::write(root.join("adreno/common.xml"), "<database/>").unwrap();
        fs::write(dir.path().join("rules.xml"), "<database/>").unwrap();

        let config = ParseConfig::new(&root);
        assert_eq!(
            config.resolve_import("adreno/common.xml"),
            Some(root.join("adreno/common.xml"))
        );
        assert_eq!(
            config.resolve_import("rules.xml"),
            Some(root.join("..").join("rules.xml"))
        );
        assert_eq!(config.resolve_import("missing.xml"), None);
    }

    #[test]
    fn test_resolve_schema() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("adreno")).unwrap();
        fs::write(dir.path().join("rules-fd.xsd"), "").unwrap();

        let xml = dir.path().join("adreno/a6xx.xml");
        assert_eq!(
            resolve_schema(&xml, "rules-fd.xsd"),
            Some(dir.path().join("adreno/../rules-fd.xsd"))
        );
        assert_eq!(resolve_schema(&xml, "other.xsd"), None);
    }
}
