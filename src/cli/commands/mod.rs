//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod check;
pub mod clean;
pub mod init;
pub mod run;
pub mod tree;

use anyhow::Result;
use clap::Subcommand;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new gantry project
    Init {
        /// Project name (defaults to the directory name)
        #[arg(short, long)]
        name: Option<String>,

        /// Overwrite an existing gantry.toml
        #[arg(short, long)]
        force: bool,
    },

    /// Evaluate the configuration and run tasks
    Run {
        /// Task names to run
        #[arg(required = true)]
        tasks: Vec<String>,

        /// Build the graph and report the order, execute nothing
        #[arg(long)]
        dry_run: bool,

        /// Keep running tasks that do not depend on a failed one
        #[arg(long)]
        continue_on_failure: bool,
    },

    /// Remove build artifacts
    Clean,

    /// Validate configuration without running tasks
    Check,

    /// Display the project tree and task dependencies
    Tree {
        /// Output in DOT graph format
        #[arg(long)]
        graph: bool,
    },
}

impl Commands {
    /// Execute the command, returning the process exit code
    pub async fn run(self, json: bool) -> Result<i32> {
        match self {
            Self::Init { name, force } => {
                let current_dir = std::env::current_dir()?;
                init::execute(&current_dir, name.as_deref(), force).await?;
                Ok(0)
            }
            Self::Run {
                tasks,
                dry_run,
                continue_on_failure,
            } => {
                let current_dir = std::env::current_dir()?;
                let options = run::RunOptions {
                    tasks,
                    dry_run,
                    continue_on_failure,
                    json,
                };
                run::execute(&current_dir, options).await
            }
            Self::Clean => {
                let current_dir = std::env::current_dir()?;
                clean::execute(&current_dir).await?;
                Ok(0)
            }
            Self::Check => {
                let current_dir = std::env::current_dir()?;
                check::execute(&current_dir, json).await?;
                Ok(0)
            }
            Self::Tree { graph } => {
                let current_dir = std::env::current_dir()?;
                tree::execute(&current_dir, graph).await?;
                Ok(0)
            }
        }
    }
}
