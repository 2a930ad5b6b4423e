//! Configuration Migration Library
//!
//! This library rewrites INI-style configuration files in place so that keys
//! and sections renamed, relocated, removed, or newly introduced across
//! successive product releases are brought up to date — while leaving every
//! byte the migration did not need to touch (comments, blank lines, unknown
//! lines, unrelated keys) exactly as it was.
//!
//! # Architecture
//!
//! The pipeline is a chain of pure transforms with I/O only at the edges:
//! - **Fragmenter**: `fragment` module — lossless tokenization of the file
//!   into an ordered fragment sequence.
//! - **Rule model**: `catalog` module — declarative, per-version tables of
//!   section and key operations, plus applicability filtering.
//! - **Engine**: `engine` module — resolves one rule set into structural
//!   edits and rebuilds the fragment sequence in a single pass.
//! - **Persistence**: `storage` module — temp-write, version-tagged backup,
//!   atomic rename.
//!
//! # Example
//!
//! ```no_run
//! use conf_migrate::{Migrator, ProductVersion};
//! use conf_migrate::error::Result;
//!
//! fn main() -> Result<()> {
//!     let migrator = Migrator::new(conf_migrate::builtin::catalog());
//!     let previous: ProductVersion = "9.1.0".parse()?;
//!     migrator.migrate_file(&previous, "gateway.ini")?;
//!     Ok(())
//! }
//! ```

pub mod builtin;
pub mod catalog;
pub mod engine;
pub mod error;
pub mod export;
pub mod fragment;
pub mod storage;
pub mod version;

use std::path::Path;

use tracing::debug;

// Re-export commonly used types
pub use catalog::Catalog;
pub use error::{MigrateError, Result};
pub use storage::Storage;
pub use version::ProductVersion;

/// What a migration run did to the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The file was already up to date; not a byte was written.
    Unchanged,
    /// The file was rewritten; a backup of the previous content exists.
    Updated,
}

/// Applies a rule catalog to configuration files.
///
/// A `Migrator` owns nothing but the catalog; every run is a pure function
/// of (catalog, previous version, file content) plus the I/O at its
/// boundary.
pub struct Migrator {
    catalog: Catalog,
}

impl Migrator {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Migrate raw file content, returning whether anything changed and the
    /// resulting text.
    ///
    /// When `previous_version` is the no-version sentinel, the version is
    /// derived from the file's `# VERSION` marker (and stays the sentinel
    /// when there is none, making every rule set applicable).
    pub fn migrate_content(
        &self,
        previous_version: &ProductVersion,
        content: &str,
    ) -> (bool, String) {
        let effective_version = if previous_version.is_no_version() {
            ProductVersion::from_start_marker(content)
        } else {
            previous_version.clone()
        };

        let mut fragments = fragment::tokenize(content);
        let mut changed = false;
        let applicable = self.catalog.applicable(&effective_version);
        debug!(
            version = %effective_version,
            rule_sets = applicable.len(),
            "scanning applicable rule sets"
        );
        for rule_set in applicable {
            let rules = rule_set.without_legacy_markers();
            let (updated, next) = engine::apply_rule_set(fragments, &rules);
            changed = changed || updated;
            fragments = next;
        }
        (changed, fragment::render(&fragments))
    }

    /// Migrate a file in place.
    ///
    /// The file is rewritten only when a rule actually touched it and the
    /// serialized result differs from the original; otherwise it stays
    /// byte-identical. On update, the pre-migration content is kept at
    /// `<file>.<previous-version>`.
    pub fn migrate_file(
        &self,
        previous_version: &ProductVersion,
        path: impl AsRef<Path>,
    ) -> Result<MigrationOutcome> {
        let storage = Storage::new(path);
        let content = storage.load()?;
        debug!(
            path = %storage.file_path().display(),
            version = %previous_version,
            "migrating configuration file"
        );

        let (changed, new_content) = self.migrate_content(previous_version, &content);
        if !changed || new_content == content {
            return Ok(MigrationOutcome::Unchanged);
        }

        storage.replace(&new_content, previous_version)?;
        Ok(MigrationOutcome::Updated)
    }
}
