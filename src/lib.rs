//! roletest - declarative test runner for role templates
//!
//! Given a role directory containing a `templates_tests/` tree of YAML test
//! definitions, roletest renders each named template with its declared
//! variable sources and compares the output line-by-line against a golden
//! file, reporting any divergence as a unified diff.
//!
//! # How a run works
//!
//! 1. [`discovery`] loads `templates_tests/meta.yml`, checks the declared
//!    specification version, and streams validated test definitions out of
//!    every `test*.yml` file under the tree.
//! 2. [`schema`] turns each raw YAML document into immutable records with a
//!    closed schema: unknown attributes, absolute paths, and missing required
//!    fields are rejected with a chained [`error::DefinitionError`].
//! 3. [`runner`] resolves fixture paths relative to the definitions file,
//!    obtains rendered output from a [`renderer::Renderer`], reads the
//!    expected-result file, and raises an [`error::TestFailure`] carrying the
//!    diff when they differ.
//!
//! # Test definition format
//!
//! ```yaml
//! # templates_tests/meta.yml
//! version: "0.1"
//! ```
//!
//! ```yaml
//! # templates_tests/test.yml
//! tests:
//!   - name: render nginx config
//!     template: nginx.conf.j2
//!     variables:
//!       inventory: inventory.yml
//!       extra: extra.yml
//!     expected_result: nginx.conf
//! ```
//!
//! `template` names a file under the role's `templates/` directory;
//! `expected_result` and the variable files are paths relative to the
//! definitions file that declares them. Variables merge lowest to highest
//! priority as role defaults, inventory, role vars, extra (see [`renderer`]).
//!
//! # Modules
//!
//! - [`schema`] - recursive-descent validation of YAML documents into domain
//!   records
//! - [`discovery`] - metadata check and lazy enumeration of definitions files
//! - [`runner`] - render, diff, and report a single test case
//! - [`renderer`] - the Tera-backed template renderer and its trait seam
//! - [`version`] - lenient specification-version parsing and comparison
//! - [`error`] - chained definition errors and assertion failures
//! - [`cli`] - the `roletest` command

pub mod cli;
pub mod discovery;
pub mod error;
pub mod renderer;
pub mod runner;
pub mod schema;
pub mod version;

pub use discovery::TestDiscovery;
pub use error::{DefinitionError, TestFailure};
pub use renderer::{Renderer, RoleRenderer};
pub use runner::TestCase;
pub use schema::{RelativePath, TestDefinition, VariableSources};
