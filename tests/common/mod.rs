//! Shared fixtures for integration tests.
//!
//! [`RoleFixture`] builds a throwaway role directory tree (templates,
//! variable files, test definitions, golden files) and runs the `roletest`
//! binary against it.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use tempfile::TempDir;

/// A temporary role directory under construction.
pub struct RoleFixture {
    dir: TempDir,
}

impl RoleFixture {
    /// An empty role directory (no `templates_tests` tree at all).
    pub fn new() -> Self {
        Self { dir: TempDir::new().unwrap() }
    }

    /// A role with `templates_tests/meta.yml` declaring the given version.
    pub fn with_meta(version: &str) -> Self {
        let fixture = Self::new();
        fixture.write("templates_tests/meta.yml", &format!("version: \"{version}\"\n"));
        fixture
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes a file under the role, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) -> &Self {
        let path = self.dir.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
        self
    }

    /// A `roletest` invocation pointed at this role.
    pub fn command(&self) -> Command {
        let mut command = Command::cargo_bin("roletest").unwrap();
        command.arg("--role-path").arg(self.dir.path());
        command
    }
}
