//! Test-definition discovery.
//!
//! Discovery walks a `templates_tests` tree, checks the declared
//! specification version in `meta.yml` against the supported one, and then
//! streams validated [`TestDefinition`]s out of every file matching
//! `test*.yml` (at any depth).
//!
//! The stream is a pull-based iterator: each definitions file is read and
//! fully validated only when its first definition is requested, and a
//! consumer that stops early leaves the remaining files untouched. A single
//! invalid file aborts the whole stream rather than being skipped; the
//! resulting [`DefinitionError`] chain names the file, the failing list
//! index, and the failing attribute.
//!
//! Yielded source paths are relative to the discovery root. File order
//! follows the directory walk and is not guaranteed to be sorted; only the
//! order of definitions within one file is meaningful.

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob::Pattern;
use semver::Version;
use serde_yaml::Value;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::error::DefinitionError;
use crate::schema::TestDefinition;
use crate::version;

/// Name of the metadata file expected directly under the discovery root.
pub const META_FILE_NAME: &str = "meta.yml";

/// Glob matched against root-relative paths to find definitions files.
pub const DEFINITION_FILE_PATTERN: &str = "**/test*.yml";

/// Parsed contents of the metadata file.
///
/// Loaded once per discovery run and discarded after the version check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meta {
    pub version: Version,
}

impl Meta {
    /// Loads and validates `meta.yml` from the given directory.
    pub fn load(base_path: &Path) -> Result<Self, DefinitionError> {
        let document = Self::load_document(base_path)?;

        if !document.is_mapping() {
            return Err(DefinitionError::new("meta is not a dictionary"));
        }

        let Some(value) = document.get("version") else {
            return Err(DefinitionError::new("testing specification version is not specified"));
        };
        let Some(text) = value.as_str() else {
            return Err(DefinitionError::new("invalid testing specification version"));
        };
        let version = version::parse_lenient(text).map_err(|err| {
            DefinitionError::with_cause("invalid testing specification version", err)
        })?;

        Ok(Self { version })
    }

    fn load_document(base_path: &Path) -> Result<Value, DefinitionError> {
        let path = base_path.join(META_FILE_NAME);
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(DefinitionError::with_cause("meta is not defined", err));
            }
            Err(err) => {
                return Err(DefinitionError::with_cause("meta is not readable", err));
            }
        };
        serde_yaml::from_str(&data)
            .map_err(|err| DefinitionError::with_cause("meta is badly formatted", err))
    }
}

/// Validates one definitions document and returns its test definitions.
///
/// The document must be a mapping whose only key is `tests`; a null `tests`
/// value means zero definitions. A failing list element is wrapped with its
/// index.
fn parse_definitions_document(document: &Value) -> Result<Vec<TestDefinition>, DefinitionError> {
    let Some(mapping) = document.as_mapping() else {
        return Err(DefinitionError::new("test definitions document is not a dictionary"));
    };

    let mut definitions = Vec::new();
    let mut tests_defined = false;

    for (key, value) in mapping {
        let Some(key) = key.as_str() else {
            return Err(DefinitionError::new("key is not a string"));
        };
        if key == "tests" {
            tests_defined = true;
            if value.is_null() {
                continue;
            }
            let Some(items) = value.as_sequence() else {
                return Err(DefinitionError::new("test definitions are not list"));
            };
            for (index, item) in items.iter().enumerate() {
                let definition = TestDefinition::from_document(item).map_err(|err| {
                    DefinitionError::with_cause(format!("invalid test definition #{index}"), err)
                })?;
                definitions.push(definition);
            }
        } else {
            return Err(DefinitionError::new(format!("unknown attribute: {key}")));
        }
    }

    if !tests_defined {
        return Err(DefinitionError::new("test definitions are not specified"));
    }

    Ok(definitions)
}

/// Lazy stream of `(definition, root-relative source path)` pairs.
///
/// Construction loads the metadata file and enforces version compatibility;
/// iteration reads one definitions file at a time. The first error fuses the
/// iterator.
///
/// ```no_run
/// use std::path::Path;
/// use roletest::discovery::TestDiscovery;
/// use roletest::version::SUPPORTED_SPEC_VERSION;
///
/// # fn example() -> anyhow::Result<()> {
/// let discovery = TestDiscovery::new(Path::new("templates_tests"), &SUPPORTED_SPEC_VERSION)?;
/// for item in discovery {
///     let (definition, source_path) = item?;
///     println!("[{}] {}", source_path.display(), definition.name);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TestDiscovery {
    root: PathBuf,
    files: std::vec::IntoIter<PathBuf>,
    ready: VecDeque<(TestDefinition, PathBuf)>,
    fused: bool,
}

impl TestDiscovery {
    /// Prepares discovery under `root`, accepting only trees declaring the
    /// given specification version.
    pub fn new(
        root: impl Into<PathBuf>,
        supported_version: &Version,
    ) -> Result<Self, DefinitionError> {
        let root = root.into();

        let meta = Meta::load(&root)
            .map_err(|err| DefinitionError::with_cause("failed to get tests metadata", err))?;
        if !version::matches(&meta.version, supported_version) {
            return Err(DefinitionError::new("unsupported testing specification version"));
        }

        let files = find_definition_files(&root)?;
        debug!(
            root = %root.display(),
            files = files.len(),
            "discovered test definition files"
        );

        Ok(Self { root, files: files.into_iter(), ready: VecDeque::new(), fused: false })
    }

    fn load_definitions(&self, path: &Path) -> Result<Vec<TestDefinition>, DefinitionError> {
        trace!(file = %path.display(), "loading test definition file");

        let data = fs::read_to_string(self.root.join(path)).map_err(|err| {
            DefinitionError::with_cause(
                format!("failed to read test definition file '{}'", path.display()),
                err,
            )
        })?;
        let document: Value = serde_yaml::from_str(&data).map_err(|err| {
            DefinitionError::with_cause(
                format!("test definition file '{}' is badly formatted", path.display()),
                err,
            )
        })?;
        parse_definitions_document(&document).map_err(|err| {
            DefinitionError::with_cause(
                format!("invalid definition file '{}'", path.display()),
                err,
            )
        })
    }
}

impl Iterator for TestDiscovery {
    type Item = Result<(TestDefinition, PathBuf), DefinitionError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.fused {
                return None;
            }
            if let Some(item) = self.ready.pop_front() {
                return Some(Ok(item));
            }
            let path = self.files.next()?;
            match self.load_definitions(&path) {
                Ok(definitions) => {
                    self.ready
                        .extend(definitions.into_iter().map(|definition| (definition, path.clone())));
                }
                Err(err) => {
                    self.fused = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

/// Collects root-relative paths of all files matching
/// [`DEFINITION_FILE_PATTERN`] under `root`.
fn find_definition_files(root: &Path) -> Result<Vec<PathBuf>, DefinitionError> {
    let pattern = Pattern::new(DEFINITION_FILE_PATTERN)
        .map_err(|err| DefinitionError::with_cause("invalid definition file pattern", err))?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|err| {
            DefinitionError::with_cause("failed to scan test definitions directory", err)
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        if pattern.matches(&relative.to_string_lossy()) {
            trace!(file = %relative.display(), "matched definition file");
            files.push(relative.to_path_buf());
        }
    }
    Ok(files)
}
