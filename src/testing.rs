//! Recording [`Collection`] used by the unit tests.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use serde_json::{Value, json};

use crate::catalog::Collection;
use crate::core::{Arguments, TaskId};

/// How often each capability was called.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Calls {
    pub load_or_create: usize,
    pub index: usize,
    pub is_installed: usize,
    pub install: usize,
    pub run: usize,
}

#[derive(Default)]
struct State {
    calls: Calls,
    installed: HashSet<TaskId>,
    install_failures: usize,
}

#[derive(Default)]
pub(crate) struct MockCollection {
    index: Value,
    fail_load: bool,
    fail_index: bool,
    fail_run: bool,
    panic_run: bool,
    installed_upstream: HashSet<String>,
    run_delay: Option<Duration>,
    state: Mutex<State>,
}

impl MockCollection {
    pub fn with_index(index: Value) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    /// A single catalog holding the given `(name, version, args)` solutions.
    pub fn with_solutions(solutions: &[(&str, &str, &[&str])]) -> Self {
        let solutions: Vec<_> = solutions
            .iter()
            .map(|(name, version, args)| {
                let args: Vec<_> = args
                    .iter()
                    .map(|arg| json!({ "name": arg, "description": format!("{arg} argument") }))
                    .collect();
                json!({ "setup": { "name": name, "version": version, "args": args } })
            })
            .collect();

        Self::with_index(json!({ "catalogs": [{ "name": "default", "solutions": solutions }] }))
    }

    pub fn fail_load(mut self) -> Self {
        self.fail_load = true;
        self
    }

    pub fn fail_index(mut self) -> Self {
        self.fail_index = true;
        self
    }

    /// The next `times` installs fail.
    pub fn fail_install(self, times: usize) -> Self {
        self.lock().install_failures = times;
        self
    }

    pub fn fail_run(mut self) -> Self {
        self.fail_run = true;
        self
    }

    pub fn panic_run(mut self) -> Self {
        self.panic_run = true;
        self
    }

    /// Reports `id` as installed before anything was installed here.
    pub fn installed(mut self, id: &str) -> Self {
        self.installed_upstream.insert(id.to_string());
        self
    }

    pub fn run_delay(mut self, delay: Duration) -> Self {
        self.run_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Calls {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Collection for MockCollection {
    fn load_or_create(&self) -> Result<()> {
        self.lock().calls.load_or_create += 1;
        if self.fail_load {
            bail!("collection database is locked");
        }
        Ok(())
    }

    fn index(&self) -> Result<Value> {
        self.lock().calls.index += 1;
        if self.fail_index {
            bail!("index unreadable");
        }
        Ok(self.index.clone())
    }

    fn is_installed(&self, id: &TaskId) -> Result<bool> {
        let mut state = self.lock();
        state.calls.is_installed += 1;
        Ok(self.installed_upstream.contains(id.as_str()) || state.installed.contains(id))
    }

    fn install(&self, id: &TaskId) -> Result<()> {
        let mut state = self.lock();
        state.calls.install += 1;
        if state.install_failures > 0 {
            state.install_failures -= 1;
            return Err(anyhow!("conda environment for {id} could not be created"));
        }
        state.installed.insert(id.clone());
        Ok(())
    }

    fn run(&self, id: &TaskId, args: &Arguments) -> Result<Value> {
        self.lock().calls.run += 1;

        if let Some(delay) = self.run_delay {
            std::thread::sleep(delay);
        }
        if self.panic_run {
            panic!("solution {id} crashed");
        }
        if self.fail_run {
            bail!("solution {id} exited with status 1");
        }

        Ok(json!({ "task": id.as_str(), "args": args }))
    }
}
