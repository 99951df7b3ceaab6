//! Command-line interface.
//!
//! One command: point the runner at a role directory and execute every
//! discovered test, printing one line per test and stopping at the first
//! failure. Discovery errors print the full flattened cause chain.
//!
//! ```bash
//! # Run the template tests of the role in the current directory
//! roletest
//!
//! # Run against another role, with debug logging
//! roletest --role-path ../roles/nginx -v
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tracing::debug;

use crate::discovery::TestDiscovery;
use crate::error::{DefinitionError, TestFailure};
use crate::renderer::RoleRenderer;
use crate::runner::TestCase;
use crate::version::SUPPORTED_SPEC_VERSION;

/// Declarative test runner for role templates.
///
/// Discovers test definitions under `<role-path>/templates_tests`, renders
/// each named template with its variable sources, and diffs the output
/// against the expected-result file.
#[derive(Debug, Parser)]
#[command(name = "roletest", version, about)]
pub struct Cli {
    /// Path to the role under test.
    #[arg(long, default_value = ".", value_name = "PATH")]
    pub role_path: PathBuf,

    /// Increase log verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Runs all discovered tests.
    ///
    /// Returns `ExitCode::FAILURE` on a discovery error or the first failing
    /// test; fixture-level problems (unreadable files, render errors)
    /// propagate as errors for the caller to report.
    pub fn execute(self) -> Result<ExitCode> {
        let tests_path = self.role_path.join("templates_tests");
        if !tests_path.is_dir() {
            debug!(path = %tests_path.display(), "no templates_tests directory, nothing to do");
            return Ok(ExitCode::SUCCESS);
        }

        let discovery = match TestDiscovery::new(&tests_path, &SUPPORTED_SPEC_VERSION) {
            Ok(discovery) => discovery,
            Err(err) => return Ok(report_definition_error(&err)),
        };
        let renderer = RoleRenderer::new(&self.role_path)?;

        for item in discovery {
            let (definition, source_path) = match item {
                Ok(pair) => pair,
                Err(err) => return Ok(report_definition_error(&err)),
            };

            print!("[{}] {} ... ", source_path.display(), definition.name);
            io::stdout().flush()?;

            let case = TestCase::new(&self.role_path, &source_path, definition);
            match case.run(&renderer) {
                Ok(()) => println!("{}", "ok".green()),
                Err(err) => match err.downcast::<TestFailure>() {
                    Ok(failure) => {
                        println!("{}", "fail".red());
                        println!("{}", failure.diff());
                        return Ok(ExitCode::FAILURE);
                    }
                    // Broken fixture or render error, not an assertion.
                    Err(err) => {
                        println!();
                        return Err(err);
                    }
                },
            }
        }

        Ok(ExitCode::SUCCESS)
    }
}

fn report_definition_error(err: &DefinitionError) -> ExitCode {
    eprintln!("{} {}", "error:".red().bold(), err.chain());
    ExitCode::FAILURE
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn role_path_defaults_to_current_directory() {
        let cli = Cli::parse_from(["roletest"]);
        assert_eq!(cli.role_path, PathBuf::from("."));
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn parses_role_path_and_verbosity() {
        let cli = Cli::parse_from(["roletest", "--role-path", "/roles/nginx", "-vv"]);
        assert_eq!(cli.role_path, PathBuf::from("/roles/nginx"));
        assert_eq!(cli.verbose, 2);
    }
}
