//! [`Collection`] backed by the `album` command line.
//!
//! Every call spawns the executable and waits for it. Output on stdout is
//! captured; a non-zero exit turns into an error carrying the trimmed
//! stderr. The one exception is `update`, see [`AlbumCli::load_or_create`].

use std::process::{Command, Output};

use anyhow::{Context, Result, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use serde_json::Value;

use crate::catalog::{CatalogIndex, Collection};
use crate::config::Config;
use crate::core::{Arguments, TaskId};

pub struct AlbumCli {
    exec: Utf8PathBuf,
}

impl AlbumCli {
    pub fn new(exec: impl Into<Utf8PathBuf>) -> Self {
        Self { exec: exec.into() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.album.clone())
    }

    pub fn exec(&self) -> &Utf8Path {
        &self.exec
    }

    fn spawn(&self, args: &[String]) -> Result<Output> {
        tracing::debug!(exec = %self.exec, ?args, "spawning album");

        Command::new(self.exec.as_std_path())
            .args(args)
            .output()
            .with_context(|| format!("failed to run {} with args {args:?}", self.exec))
    }

    fn album(&self, args: &[String]) -> Result<String> {
        let output = self.spawn(args)?;
        if !output.status.success() {
            return Err(self.exit_error(&output));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn exit_error(&self, output: &Output) -> anyhow::Error {
        anyhow!(
            "{} exited with {}: {}",
            self.exec,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )
    }
}

impl Collection for AlbumCli {
    /// Runs `album update`, which creates the collection database when it
    /// doesn't exist yet.
    ///
    /// `update` also pulls the catalogs from their remote sources. When that
    /// part fails the local collection is still usable, so a non-zero exit is
    /// only logged. Failing to start `album` at all is an error.
    fn load_or_create(&self) -> Result<()> {
        let output = self.spawn(&["update".into()])?;
        if !output.status.success() {
            tracing::warn!(
                "couldn't update the catalogs, using the local collection: {}",
                self.exit_error(&output)
            );
        }
        Ok(())
    }

    fn index(&self) -> Result<Value> {
        let stdout = self.album(&["index".into(), "--json".into()])?;
        serde_json::from_str(stdout.trim()).context("album printed an index that isn't JSON")
    }

    fn is_installed(&self, id: &TaskId) -> Result<bool> {
        let index = CatalogIndex::from_value(self.index()?)?;
        Ok(index
            .solution(id)
            .and_then(|solution| solution.installed)
            .unwrap_or(false))
    }

    fn install(&self, id: &TaskId) -> Result<()> {
        self.album(&["install".into(), id.to_string()])?;
        Ok(())
    }

    fn run(&self, id: &TaskId, args: &Arguments) -> Result<Value> {
        let stdout = self.album(&run_args(id, args))?;
        Ok(Value::String(stdout.trim_end().to_string()))
    }
}

fn run_args(id: &TaskId, args: &Arguments) -> Vec<String> {
    let mut argv = Vec::with_capacity(2 + args.len() * 2);
    argv.push("run".to_string());
    argv.push(id.to_string());

    for (key, value) in args {
        argv.push(format!("--{key}"));
        argv.push(match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });
    }

    argv
}
