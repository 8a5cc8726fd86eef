//! Process-level settings for the runtime.
//!
//! Everything has a usable default, so `Config::default()` works on a machine
//! with `album` on the `PATH`. Environment overrides are read once by
//! [`Config::from_env`].

use std::env;
use std::num::NonZeroUsize;

use camino::Utf8PathBuf;

use crate::error::ConfigError;

/// Executable used when `ALBUM_EXEC` is not set.
pub const ALBUM_EXEC: &str = "album";

const ENV_ALBUM_EXEC: &str = "ALBUM_EXEC";
const ENV_WORKERS: &str = "ALBUM_TASKS_WORKERS";

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the `album` executable.
    pub album: Utf8PathBuf,
    /// Number of worker threads for spawned invocations. `None` lets rayon
    /// pick one per logical CPU.
    pub workers: Option<NonZeroUsize>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var_os(key).map(|value| value.into_string()))
    }

    /// Builds the config from an arbitrary variable source. `Some(Err(_))`
    /// stands for a value that is present but not valid UTF-8.
    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<Result<String, std::ffi::OsString>>,
    {
        let mut config = Config::default();

        match lookup(ENV_ALBUM_EXEC) {
            Some(Ok(path)) if !path.trim().is_empty() => config.album = path.into(),
            Some(Ok(_)) | None => {}
            Some(Err(_)) => return Err(ConfigError::PathFormat(ENV_ALBUM_EXEC)),
        }

        match lookup(ENV_WORKERS) {
            Some(Ok(raw)) => {
                let workers = raw
                    .trim()
                    .parse::<NonZeroUsize>()
                    .map_err(|_| ConfigError::Invalid(ENV_WORKERS, raw.clone()))?;
                config.workers = Some(workers);
            }
            Some(Err(raw)) => {
                return Err(ConfigError::Invalid(
                    ENV_WORKERS,
                    raw.to_string_lossy().into_owned(),
                ));
            }
            None => {}
        }

        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            album: Utf8PathBuf::from(ALBUM_EXEC),
            workers: None,
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::*;

    fn lookup(
        vars: &[(&str, &str)],
    ) -> impl Fn(&str) -> Option<Result<String, std::ffi::OsString>> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned().map(Ok)
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.album, "album");
        assert!(config.workers.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("ALBUM_EXEC", "/opt/album/bin/album"),
            ("ALBUM_TASKS_WORKERS", " 4 "),
        ]))
        .unwrap();

        assert_eq!(config.album, "/opt/album/bin/album");
        assert_eq!(config.workers, NonZeroUsize::new(4));
    }

    #[test]
    fn test_blank_exec_keeps_default() {
        let config = Config::from_lookup(lookup(&[("ALBUM_EXEC", "  ")])).unwrap();
        assert_eq!(config.album, "album");
    }

    #[test]
    fn test_invalid_workers() {
        for raw in ["0", "many", "-2"] {
            let err = Config::from_lookup(lookup(&[("ALBUM_TASKS_WORKERS", raw)])).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid("ALBUM_TASKS_WORKERS", _)));
        }
    }
}
