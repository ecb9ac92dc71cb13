use crate::error::{MinderError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Options for supervising an external command
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorOptions {
    /// Discard the child's stdout/stderr instead of inheriting them
    #[serde(default)]
    pub silent: bool,

    /// Replacement environment for the child; `None` inherits the
    /// supervisor's own environment
    #[serde(default)]
    pub env: Option<HashMap<String, String>>,
}

/// Options for supervising a module run under a controlled interpreter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleOptions {
    #[serde(default)]
    pub silent: bool,

    #[serde(default)]
    pub env: Option<HashMap<String, String>>,

    /// Hold the supervisor back until the child reports "ready" over the IPC
    /// channel, or the readiness timeout elapses
    #[serde(default)]
    pub wait_for_ready: bool,

    /// Interpreter binary the module runs under; defaults to the supervisor's
    /// own executable
    #[serde(default)]
    pub exec_path: Option<PathBuf>,

    /// Arguments for the interpreter itself, placed before the module path
    #[serde(default)]
    pub exec_argv: Option<ExecArgv>,
}

/// Interpreter arguments, either pre-split or as one whitespace-delimited line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExecArgv {
    List(Vec<String>),
    Line(String),
}

impl ExecArgv {
    pub fn into_args(self) -> Vec<String> {
        match self {
            ExecArgv::List(args) => args,
            ExecArgv::Line(line) => line.split_whitespace().map(str::to_string).collect(),
        }
    }
}

/// What to launch. Immutable once a launch begins; the supervisor retains it
/// solely so `restart()` can re-issue the identical spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LaunchSpec {
    /// External command resolved from a single command line
    Command {
        program: PathBuf,
        args: Vec<String>,
    },

    /// Module run under a controlled interpreter invocation:
    /// `exec_path exec_argv... module_path args...`
    Module {
        module_path: PathBuf,
        args: Vec<String>,
        exec_path: PathBuf,
        exec_argv: Vec<String>,
    },
}

impl LaunchSpec {
    /// Parse a whitespace-separated command line.
    ///
    /// The first token is the executable: a leading-`.` token is resolved to
    /// an absolute path, anything else is left for normal `PATH` lookup.
    pub fn command(cmd: &str) -> Result<Self> {
        let mut parts = cmd.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| MinderError::InvalidSpec("empty command line".to_string()))?;

        Ok(LaunchSpec::Command {
            program: resolve_relative(program)?,
            args: parts.map(str::to_string).collect(),
        })
    }

    /// Build a module spec, applying the interpreter defaults.
    pub fn module(
        module_path: PathBuf,
        args: Vec<String>,
        exec_path: Option<PathBuf>,
        exec_argv: Option<ExecArgv>,
    ) -> Result<Self> {
        let exec_path = match exec_path {
            Some(path) => match path.to_str() {
                Some(s) => resolve_relative(s)?,
                None => path,
            },
            None => std::env::current_exe()?,
        };

        Ok(LaunchSpec::Module {
            module_path,
            args,
            exec_path,
            exec_argv: exec_argv.map(ExecArgv::into_args).unwrap_or_default(),
        })
    }
}

/// Resolve a leading-`.` path to an absolute one; leave everything else alone.
fn resolve_relative(token: &str) -> Result<PathBuf> {
    let path = PathBuf::from(token);
    if token.starts_with('.') {
        Ok(std::path::absolute(&path)?)
    } else {
        Ok(path)
    }
}
