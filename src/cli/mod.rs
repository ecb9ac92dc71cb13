// CLI module - user-facing command-line interface

use crate::config::{ExecArgv, ModuleOptions, MonitorOptions};
use crate::process::{monitor, monitor_module, Supervisor};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;

/// Minder - a minimal single-process supervisor
#[derive(Parser)]
#[command(name = "minder")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Supervise an external command until it exits
    Run {
        /// Discard the child's output instead of inheriting the terminal
        #[arg(short, long)]
        silent: bool,

        /// Environment variables (KEY=VALUE format); replaces the inherited
        /// environment entirely
        #[arg(short, long)]
        env: Vec<String>,

        /// Command line to run
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// Supervise a module run under a controlled interpreter
    Module {
        /// Path to the module to run
        module: PathBuf,

        /// Discard the child's output instead of inheriting the terminal
        #[arg(short, long)]
        silent: bool,

        /// Environment variables (KEY=VALUE format)
        #[arg(short, long)]
        env: Vec<String>,

        /// Wait (up to 5s) for the child to report readiness
        #[arg(short, long)]
        wait_for_ready: bool,

        /// Interpreter binary to run the module with
        #[arg(long)]
        exec_path: Option<PathBuf>,

        /// Arguments for the interpreter itself, space-delimited
        #[arg(long)]
        exec_argv: Option<String>,

        /// Arguments to pass to the module
        #[arg(last = true)]
        args: Vec<String>,
    },
}

impl Cli {
    pub async fn run() -> anyhow::Result<()> {
        let cli = Cli::parse();

        let supervisor = match cli.command {
            Commands::Run {
                silent,
                env,
                command,
            } => {
                let options = MonitorOptions {
                    silent,
                    env: parse_env(&env)?,
                };
                monitor(&command.join(" "), options).await?
            }
            Commands::Module {
                module,
                silent,
                env,
                wait_for_ready,
                exec_path,
                exec_argv,
                args,
            } => {
                let options = ModuleOptions {
                    silent,
                    env: parse_env(&env)?,
                    wait_for_ready,
                    exec_path,
                    exec_argv: exec_argv.map(ExecArgv::Line),
                };
                monitor_module(module, args, options).await?
            }
        };

        supervise(supervisor).await
    }
}

/// Run until the child exits, forwarding Ctrl-C as a stop request.
async fn supervise(supervisor: Supervisor) -> anyhow::Result<()> {
    tokio::select! {
        result = supervisor.wait() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received, stopping child");
            supervisor.stop().await?;
        }
    }
    Ok(())
}

fn parse_env(pairs: &[String]) -> anyhow::Result<Option<HashMap<String, String>>> {
    if pairs.is_empty() {
        return Ok(None);
    }

    let mut env = HashMap::new();
    for pair in pairs {
        let (key, value) = pair.split_once('=').with_context(|| {
            format!("invalid environment variable '{}', expected KEY=VALUE", pair)
        })?;
        env.insert(key.to_string(), value.to_string());
    }
    Ok(Some(env))
}
