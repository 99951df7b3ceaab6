//! Test execution: render a template, diff it against its golden file.
//!
//! A [`TestCase`] couples one validated [`TestDefinition`] with the role it
//! belongs to and the definitions file it came from. Variable and
//! expected-result paths resolve against the directory of that definitions
//! file, so fixtures can sit next to the definitions that use them anywhere
//! under `templates_tests/`.
//!
//! A mismatch between rendered and expected text raises a [`TestFailure`]
//! carrying a unified diff; I/O problems (an unreadable golden file, a
//! missing variable file) propagate as plain errors since they indicate a
//! broken fixture, not a rendering regression. Running the same case twice
//! on unchanged inputs produces byte-identical results.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use similar::TextDiff;
use tracing::debug;

use crate::error::TestFailure;
use crate::renderer::Renderer;
use crate::schema::TestDefinition;

/// One runnable render-and-compare case.
pub struct TestCase {
    role_path: PathBuf,
    source_path: PathBuf,
    definition: TestDefinition,
}

impl TestCase {
    /// Creates a case for `definition`, discovered in the definitions file at
    /// `source_path` (relative to `<role>/templates_tests`, or absolute).
    pub fn new(
        role_path: impl Into<PathBuf>,
        source_path: impl Into<PathBuf>,
        definition: TestDefinition,
    ) -> Self {
        Self { role_path: role_path.into(), source_path: source_path.into(), definition }
    }

    pub fn definition(&self) -> &TestDefinition {
        &self.definition
    }

    /// Directory that relative fixture paths resolve against: the directory
    /// containing the definitions file.
    fn base_path(&self) -> PathBuf {
        let parent = self.source_path.parent().unwrap_or(Path::new(""));
        if parent.is_absolute() {
            parent.to_path_buf()
        } else {
            self.role_path.join("templates_tests").join(parent)
        }
    }

    fn inventory_path(&self) -> Option<PathBuf> {
        self.definition.inventory().map(|path| self.base_path().join(path))
    }

    fn extra_path(&self) -> Option<PathBuf> {
        self.definition.extra().map(|path| self.base_path().join(path))
    }

    /// Renders the template and compares the output line-by-line against the
    /// expected-result file.
    pub fn run(&self, renderer: &dyn Renderer) -> Result<()> {
        debug!(test = %self.definition.name, "running test case");

        let actual = renderer.render(
            &self.definition.template,
            self.inventory_path().as_deref(),
            self.extra_path().as_deref(),
        )?;

        let expected_path = self.base_path().join(&self.definition.expected_result);
        let expected = fs::read_to_string(&expected_path)?;

        // Line-based comparison: a missing trailing newline is not a
        // difference, matching the diff the failure would report.
        let expected_text = expected.lines().collect::<Vec<_>>().join("\n");
        let actual_text = actual.lines().collect::<Vec<_>>().join("\n");
        if expected_text == actual_text {
            return Ok(());
        }

        let from_label = expected_path
            .strip_prefix(&self.role_path)
            .unwrap_or(&expected_path)
            .display()
            .to_string();
        let to_label = format!(
            "render({})",
            Path::new("templates").join(&self.definition.template).display()
        );

        let diff = TextDiff::from_lines(&expected_text, &actual_text);
        let mut text = diff
            .unified_diff()
            .missing_newline_hint(false)
            .header(&from_label, &to_label)
            .to_string();
        if text.ends_with('\n') {
            text.pop();
        }
        Err(TestFailure::new(text).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RelativePath;
    use serde_yaml::Value;
    use std::cell::RefCell;
    use tempfile::TempDir;

    fn relative_path(text: &str) -> RelativePath {
        RelativePath::parse(&Value::from(text)).unwrap()
    }

    fn definition(variables: Option<crate::schema::VariableSources>) -> TestDefinition {
        TestDefinition {
            name: "t1".to_string(),
            template: relative_path("foo.j2"),
            variables,
            expected_result: relative_path("foo"),
        }
    }

    fn sources(inventory: Option<&str>, extra: Option<&str>) -> crate::schema::VariableSources {
        crate::schema::VariableSources {
            inventory: inventory.map(relative_path),
            extra: extra.map(relative_path),
        }
    }

    /// Renderer stub returning fixed text and recording the paths it was
    /// handed.
    struct StubRenderer {
        output: String,
        calls: RefCell<Vec<(PathBuf, Option<PathBuf>, Option<PathBuf>)>>,
    }

    impl StubRenderer {
        fn returning(output: &str) -> Self {
            Self { output: output.to_string(), calls: RefCell::new(Vec::new()) }
        }
    }

    impl Renderer for StubRenderer {
        fn render(
            &self,
            template: &RelativePath,
            inventory: Option<&Path>,
            extra: Option<&Path>,
        ) -> Result<String> {
            self.calls.borrow_mut().push((
                template.as_path().to_path_buf(),
                inventory.map(Path::to_path_buf),
                extra.map(Path::to_path_buf),
            ));
            Ok(self.output.clone())
        }
    }

    #[test]
    fn base_path_joins_relative_source_under_templates_tests() {
        let case = TestCase::new("/role", "subdir/test.yml", definition(None));
        assert_eq!(case.base_path(), PathBuf::from("/role/templates_tests/subdir"));

        let case = TestCase::new("/role", "test.yml", definition(None));
        assert_eq!(case.base_path(), PathBuf::from("/role/templates_tests"));
    }

    #[test]
    fn base_path_keeps_absolute_source() {
        let case = TestCase::new("/role", "/elsewhere/tests/test.yml", definition(None));
        assert_eq!(case.base_path(), PathBuf::from("/elsewhere/tests"));
    }

    #[test]
    fn variable_paths_resolve_against_base_path() {
        let case = TestCase::new(
            "/role",
            "sub/test.yml",
            definition(Some(sources(Some("inventory.yml"), Some("extra.yml")))),
        );
        assert_eq!(
            case.inventory_path().unwrap(),
            PathBuf::from("/role/templates_tests/sub/inventory.yml"),
        );
        assert_eq!(
            case.extra_path().unwrap(),
            PathBuf::from("/role/templates_tests/sub/extra.yml"),
        );
    }

    #[test]
    fn variable_paths_absent_without_sources() {
        let case = TestCase::new("/role", "test.yml", definition(None));
        assert!(case.inventory_path().is_none());
        assert!(case.extra_path().is_none());
    }

    #[test]
    fn passes_when_output_matches_expected() {
        let role = TempDir::new().unwrap();
        fs::create_dir_all(role.path().join("templates_tests")).unwrap();
        fs::write(role.path().join("templates_tests/foo"), "content\n").unwrap();

        let renderer = StubRenderer::returning("content\n");
        let case = TestCase::new(role.path(), "test.yml", definition(None));
        case.run(&renderer).unwrap();
    }

    #[test]
    fn fails_with_unified_diff_on_mismatch() {
        let role = TempDir::new().unwrap();
        fs::create_dir_all(role.path().join("templates_tests")).unwrap();
        fs::write(role.path().join("templates_tests/foo"), "baz\n").unwrap();

        let renderer = StubRenderer::returning("bar\n");
        let case = TestCase::new(role.path(), "test.yml", definition(None));
        let err = case.run(&renderer).unwrap_err();
        let failure = err.downcast::<TestFailure>().unwrap();
        assert_eq!(
            failure.diff(),
            "--- templates_tests/foo\n\
             +++ render(templates/foo.j2)\n\
             @@ -1 +1 @@\n\
             -baz\n\
             +bar",
        );
    }

    #[test]
    fn diff_is_deterministic() {
        let role = TempDir::new().unwrap();
        fs::create_dir_all(role.path().join("templates_tests")).unwrap();
        fs::write(role.path().join("templates_tests/foo"), "one\ntwo\nthree\n").unwrap();

        let renderer = StubRenderer::returning("one\nTWO\nthree\n");
        let case = TestCase::new(role.path(), "test.yml", definition(None));

        let first = case.run(&renderer).unwrap_err().downcast::<TestFailure>().unwrap();
        let second = case.run(&renderer).unwrap_err().downcast::<TestFailure>().unwrap();
        assert_eq!(first.diff(), second.diff());
    }

    #[test]
    fn trailing_newline_does_not_affect_line_comparison() {
        // Line-based comparison: "baz" and "baz\n" hold the same lines.
        let role = TempDir::new().unwrap();
        fs::create_dir_all(role.path().join("templates_tests")).unwrap();
        fs::write(role.path().join("templates_tests/foo"), "baz").unwrap();

        let renderer = StubRenderer::returning("baz\n");
        let case = TestCase::new(role.path(), "test.yml", definition(None));
        case.run(&renderer).unwrap();
    }

    #[test]
    fn renderer_receives_template_and_variable_paths() {
        let role = TempDir::new().unwrap();
        fs::create_dir_all(role.path().join("templates_tests")).unwrap();
        fs::write(role.path().join("templates_tests/foo"), "out\n").unwrap();

        let renderer = StubRenderer::returning("out\n");
        let case = TestCase::new(
            role.path(),
            "test.yml",
            definition(Some(sources(Some("inventory.yml"), None))),
        );
        case.run(&renderer).unwrap();

        let calls = renderer.calls.borrow();
        let (template, inventory, extra) = &calls[0];
        assert_eq!(template, &PathBuf::from("foo.j2"));
        assert_eq!(
            inventory.as_deref(),
            Some(role.path().join("templates_tests/inventory.yml").as_path()),
        );
        assert!(extra.is_none());
    }

    #[test]
    fn missing_expected_file_propagates_io_error() {
        let role = TempDir::new().unwrap();
        let renderer = StubRenderer::returning("out\n");
        let case = TestCase::new(role.path(), "test.yml", definition(None));
        let err = case.run(&renderer).unwrap_err();
        // Fixture problem, not an assertion failure.
        assert!(err.downcast_ref::<TestFailure>().is_none());
        assert!(err.downcast_ref::<std::io::Error>().is_some());
    }
}
