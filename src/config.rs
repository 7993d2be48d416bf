// Configuration: Cloudinary credentials and the handful of settings the
// remote commands need. Values come from the process environment, seeded
// from a dotenv file that sits next to the site sources.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default dotenv location, relative to the working directory.
pub const DEFAULT_ENV_FILE: &str = "src/.env";

/// Top-level namespace on Cloudinary for every asset of the site.
pub const DEFAULT_ROOT_FOLDER: &str = "website";

pub const DEFAULT_API_BASE: &str = "https://api.cloudinary.com/v1_1";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),

    #[error("failed to read env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

/// Account credentials for both the Admin and the Upload API.
#[derive(Clone)]
pub struct Credentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub credentials: Credentials,
    pub api_base: String,
    pub root_folder: String,
}

/// Load the dotenv file into the process environment. Variables that are
/// already set are left alone. A missing file is fine: the environment may
/// already carry everything.
pub fn load_env_file(path: &Path) -> Result<(), ConfigError> {
    match dotenvy::from_path(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "loaded env file");
            Ok(())
        }
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "env file not found, using process environment");
            Ok(())
        }
        Err(source) => Err(ConfigError::EnvFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}

impl Settings {
    /// Build settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup. Empty values count
    /// as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let credentials = Credentials {
            cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
            api_key: required("CLOUDINARY_API_KEY")?,
            api_secret: required("CLOUDINARY_API_SECRET")?,
        };
        let api_base = get("CLOUDINARY_API_BASE")
            .map(|b| b.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.into());
        let root_folder = get("CLOUDINARY_ROOT_FOLDER")
            .map(|r| r.trim_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_ROOT_FOLDER.into());

        Ok(Settings {
            credentials,
            api_base,
            root_folder,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_optional_vars_absent() {
        let settings = Settings::from_lookup(lookup(&[
            ("CLOUDINARY_CLOUD_NAME", "demo"),
            ("CLOUDINARY_API_KEY", "123"),
            ("CLOUDINARY_API_SECRET", "s3cr3t"),
        ]))
        .unwrap();

        assert_eq!(settings.credentials.cloud_name, "demo");
        assert_eq!(settings.api_base, DEFAULT_API_BASE);
        assert_eq!(settings.root_folder, "website");
    }

    #[test]
    fn empty_credential_is_reported_by_name() {
        let err = Settings::from_lookup(lookup(&[
            ("CLOUDINARY_CLOUD_NAME", "demo"),
            ("CLOUDINARY_API_KEY", "  "),
            ("CLOUDINARY_API_SECRET", "s3cr3t"),
        ]))
        .unwrap_err();

        assert!(matches!(err, ConfigError::Missing("CLOUDINARY_API_KEY")));
    }

    #[test]
    fn overrides_are_normalised() {
        let settings = Settings::from_lookup(lookup(&[
            ("CLOUDINARY_CLOUD_NAME", "demo"),
            ("CLOUDINARY_API_KEY", "123"),
            ("CLOUDINARY_API_SECRET", "s3cr3t"),
            ("CLOUDINARY_API_BASE", "http://127.0.0.1:9000/v1_1/"),
            ("CLOUDINARY_ROOT_FOLDER", "/staging/"),
        ]))
        .unwrap();

        assert_eq!(settings.api_base, "http://127.0.0.1:9000/v1_1");
        assert_eq!(settings.root_folder, "staging");
    }

    #[test]
    fn debug_hides_secret() {
        let creds = Credentials {
            cloud_name: "demo".into(),
            api_key: "123".into(),
            api_secret: "hunter2".into(),
        };
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }

    #[test]
    fn missing_env_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_env_file(&dir.path().join("nope.env")).is_ok());
    }
}
