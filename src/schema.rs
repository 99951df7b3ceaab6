//! Schema validation for test-definition documents.
//!
//! Test definitions arrive as untyped YAML trees ([`serde_yaml::Value`]).
//! This module walks those trees with a recursive-descent validator and
//! produces immutable domain records, rejecting anything outside the closed
//! schema: unknown attributes, wrong value types, absolute paths, and missing
//! required fields all fail with a [`DefinitionError`] whose cause chain
//! pinpoints the offending attribute.
//!
//! Validation is pure: no file-system access happens here. Path attributes
//! are checked for shape only (non-empty, relative); whether they point at an
//! existing file is the runner's problem.
//!
//! Within a document, keys are validated in the order the document lists
//! them, and only after every key is consumed are the required-field checks
//! applied, in the fixed order name, template, expected result. Error
//! messages are stable: downstream tooling matches on them.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::error::DefinitionError;

/// A validated path attribute: guaranteed non-empty and relative.
///
/// Paths in test definitions are always resolved against the directory of
/// the definitions file that declared them, so absolute paths are rejected
/// at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelativePath(PathBuf);

impl RelativePath {
    /// Validates a YAML scalar as a relative path.
    pub fn parse(value: &Value) -> Result<Self, DefinitionError> {
        let Some(text) = value.as_str() else {
            return Err(DefinitionError::new("path is not a string"));
        };
        if text.is_empty() {
            return Err(DefinitionError::new("path is empty string"));
        }
        let path = PathBuf::from(text);
        if path.is_absolute() {
            return Err(DefinitionError::new("path is not relative"));
        }
        Ok(Self(path))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for RelativePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Optional variable-file references attached to a test definition.
///
/// Both files feed the renderer's variable merge; `inventory` sits below the
/// role's own `vars/` in precedence while `extra` sits above everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableSources {
    pub inventory: Option<RelativePath>,
    pub extra: Option<RelativePath>,
}

impl VariableSources {
    /// Validates the value of a `variables` attribute.
    ///
    /// Recognized keys are exactly `inventory` and `extra`; a null value
    /// leaves the corresponding field unset.
    pub fn from_document(document: &Value) -> Result<Self, DefinitionError> {
        let Some(mapping) = document.as_mapping() else {
            return Err(DefinitionError::new("variables attribute is not a dictionary"));
        };

        let mut inventory = None;
        let mut extra = None;

        for (key, value) in mapping {
            let Some(key) = key.as_str() else {
                return Err(DefinitionError::new("key is not a string"));
            };
            match key {
                "inventory" => {
                    if !value.is_null() {
                        inventory = Some(RelativePath::parse(value).map_err(|err| {
                            DefinitionError::with_cause("invalid inventory attribute", err)
                        })?);
                    }
                }
                "extra" => {
                    if !value.is_null() {
                        extra = Some(RelativePath::parse(value).map_err(|err| {
                            DefinitionError::with_cause("invalid extra attribute", err)
                        })?);
                    }
                }
                other => {
                    return Err(DefinitionError::new(format!("unknown attribute: {other}")));
                }
            }
        }

        Ok(Self { inventory, extra })
    }
}

/// One render-and-compare test case.
///
/// `template` is relative to the role's `templates/` directory;
/// `expected_result` and the variable files are relative to the directory of
/// the definitions file the case came from. Constructed by
/// [`TestDefinition::from_document`] and consumed exactly once by the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDefinition {
    pub name: String,
    pub template: RelativePath,
    pub variables: Option<VariableSources>,
    pub expected_result: RelativePath,
}

impl TestDefinition {
    /// Validates one element of a `tests` list.
    pub fn from_document(document: &Value) -> Result<Self, DefinitionError> {
        let Some(mapping) = document.as_mapping() else {
            return Err(DefinitionError::new("test definition is not a dictionary"));
        };

        let mut name = None;
        let mut template = None;
        let mut variables = None;
        let mut expected_result = None;

        for (key, value) in mapping {
            let Some(key) = key.as_str() else {
                return Err(DefinitionError::new("key is not a string"));
            };
            match key {
                "name" => {
                    if !value.is_null() {
                        let Some(text) = value.as_str() else {
                            return Err(DefinitionError::new("name is not a string"));
                        };
                        name = Some(text.to_string());
                    }
                }
                "template" => {
                    if !value.is_null() {
                        template = Some(RelativePath::parse(value).map_err(|err| {
                            DefinitionError::with_cause("invalid template attribute", err)
                        })?);
                    }
                }
                "variables" => {
                    if !value.is_null() {
                        variables = Some(VariableSources::from_document(value).map_err(|err| {
                            DefinitionError::with_cause("invalid variables attribute", err)
                        })?);
                    }
                }
                "expected_result" => {
                    if !value.is_null() {
                        expected_result = Some(RelativePath::parse(value).map_err(|err| {
                            DefinitionError::with_cause("invalid expected result attribute", err)
                        })?);
                    }
                }
                other => {
                    return Err(DefinitionError::new(format!("unknown attribute: {other}")));
                }
            }
        }

        let Some(name) = name else {
            return Err(DefinitionError::new("name is not specified"));
        };
        let Some(template) = template else {
            return Err(DefinitionError::new("template is not specified"));
        };
        let Some(expected_result) = expected_result else {
            return Err(DefinitionError::new("expected result is not specified"));
        };

        Ok(Self { name, template, variables, expected_result })
    }

    /// The inventory variable file, if one is declared.
    pub fn inventory(&self) -> Option<&RelativePath> {
        self.variables.as_ref().and_then(|sources| sources.inventory.as_ref())
    }

    /// The extra variable file, if one is declared.
    pub fn extra(&self) -> Option<&RelativePath> {
        self.variables.as_ref().and_then(|sources| sources.extra.as_ref())
    }
}
