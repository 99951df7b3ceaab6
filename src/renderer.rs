//! Template rendering for role tests.
//!
//! The runner only depends on the [`Renderer`] trait; [`RoleRenderer`] is the
//! production implementation backed by the Tera engine, loading templates
//! from the role's `templates/` directory.
//!
//! # Variable precedence
//!
//! Variables handed to a template are merged from up to four sources, lowest
//! to highest priority, each later source overwriting same-named top-level
//! keys from earlier ones:
//!
//! 1. role `defaults/` variables
//! 2. the test's inventory file
//! 3. role `vars/` variables
//! 4. the test's extra file
//!
//! Role variable files are the first existing of `main.yml`, `main.yaml`,
//! or `main` inside the respective directory; a missing file contributes
//! nothing. Undefined variables referenced by a template are a render error
//! (the engine is strict).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde_yaml::{Mapping, Value};
use tera::Tera;
use tracing::{debug, trace};

use crate::schema::RelativePath;

/// Filenames probed for role-level variable files, in priority order.
const ROLE_VARIABLE_FILENAMES: &[&str] = &["main.yml", "main.yaml", "main"];

/// Renders a named template against merged variable sources.
pub trait Renderer {
    /// Renders `template` (relative to the role's `templates/` directory)
    /// with the optional inventory and extra variable files merged in.
    fn render(
        &self,
        template: &RelativePath,
        inventory: Option<&Path>,
        extra: Option<&Path>,
    ) -> Result<String>;
}

/// Tera-backed renderer over a role directory.
pub struct RoleRenderer {
    role_path: PathBuf,
    engine: Tera,
}

impl RoleRenderer {
    /// Loads all templates under `<role>/templates/` into a new renderer.
    ///
    /// A role without a `templates/` directory yields a renderer that knows
    /// no templates; rendering against it fails per template.
    pub fn new(role_path: impl Into<PathBuf>) -> Result<Self> {
        let role_path = role_path.into();
        let templates_glob = format!("{}/**/*", role_path.join("templates").display());
        let mut engine = Tera::new(&templates_glob)
            .with_context(|| format!("failed to load templates from '{templates_glob}'"))?;
        // Role templates are plain config text, never markup.
        engine.autoescape_on(vec![]);
        debug!(role = %role_path.display(), "loaded role templates");
        Ok(Self { role_path, engine })
    }

    fn merge_variables(
        &self,
        inventory: Option<Mapping>,
        extra: Option<Mapping>,
    ) -> Result<Mapping> {
        let mut merged = Mapping::new();
        extend(&mut merged, self.load_role_variables("defaults")?);
        if let Some(variables) = inventory {
            extend(&mut merged, variables);
        }
        extend(&mut merged, self.load_role_variables("vars")?);
        if let Some(variables) = extra {
            extend(&mut merged, variables);
        }
        Ok(merged)
    }

    fn load_role_variables(&self, dirname: &str) -> Result<Mapping> {
        for filename in ROLE_VARIABLE_FILENAMES {
            let path = self.role_path.join(dirname).join(filename);
            if path.is_file() {
                trace!(file = %path.display(), "loading role variables");
                return load_variable_file(&path);
            }
        }
        Ok(Mapping::new())
    }
}

impl Renderer for RoleRenderer {
    fn render(
        &self,
        template: &RelativePath,
        inventory: Option<&Path>,
        extra: Option<&Path>,
    ) -> Result<String> {
        let inventory = inventory.map(load_variable_file).transpose()?;
        let extra = extra.map(load_variable_file).transpose()?;
        let variables = self.merge_variables(inventory, extra)?;

        let context = tera::Context::from_serialize(Value::Mapping(variables))
            .context("failed to build template context from variables")?;
        let name = template.as_path().to_string_lossy();
        self.engine
            .render(&name, &context)
            .with_context(|| format!("failed to render template '{template}'"))
    }
}

/// Overwrites `target` keys with `source` keys; the merge is shallow, nested
/// mappings are replaced wholesale.
fn extend(target: &mut Mapping, source: Mapping) {
    for (key, value) in source {
        target.insert(key, value);
    }
}

fn load_variable_file(path: &Path) -> Result<Mapping> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read variable file '{}'", path.display()))?;
    let document: Value = serde_yaml::from_str(&data)
        .with_context(|| format!("variable file '{}' is badly formatted", path.display()))?;
    match document {
        Value::Null => Ok(Mapping::new()),
        Value::Mapping(mapping) => Ok(mapping),
        _ => bail!("variable file '{}' is not a dictionary", path.display()),
    }
}
