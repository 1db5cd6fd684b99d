//! Settings file loader.

use std::path::{Path, PathBuf};

use super::Settings;

/// File name searched in the working directory.
const LOCAL_CONFIG: &str = "legal-triage.toml";

/// Errors from loading settings.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Load settings from an explicit path.
///
/// # Errors
///
/// Returns `ConfigError::Read` if the file cannot be read and
/// `ConfigError::Parse` if it is not valid TOML.
pub fn load_from_path(path: &Path) -> Result<Settings, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Locate the settings file: `./legal-triage.toml`, then the per-user
/// config directory.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG);
    if local.exists() {
        return Some(local);
    }
    let user = dirs::config_dir()?.join("legal-triage").join("config.toml");
    user.exists().then_some(user)
}

/// Load settings from the given path, the default search locations, or
/// built-in defaults when no file exists.
///
/// # Errors
///
/// Returns an error only for a file that exists but cannot be read or parsed.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings, ConfigError> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path(),
    };
    match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Loading settings file");
            load_from_path(&path)
        }
        None => Ok(Settings::default()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[server]\nport = 9999").unwrap();

        let settings = load_from_path(&path).unwrap();
        assert_eq!(settings.server.port, 9999);
    }

    #[test]
    fn test_load_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_from_path(&dir.path().join("nope.toml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_load_invalid_toml_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "not [ valid").unwrap();
        let result = load_from_path(&path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_explicit_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("explicit.toml");
        std::fs::write(&path, "[triage]\nnormalize_answers = false").unwrap();

        let settings = load_settings(Some(&path)).unwrap();
        assert!(!settings.triage.normalize_answers);
    }
}
