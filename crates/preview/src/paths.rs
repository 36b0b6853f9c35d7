//! Resolves which configuration file the preview reads.
//!
//! Precedence: `--config`, then `GRIDSCAN_CONFIG`, then `gridscan.toml` in the
//! per-user config directory. Only the last one may be missing.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use directories_next::ProjectDirs;

pub const ENV_CONFIG: &str = "GRIDSCAN_CONFIG";
pub const CONFIG_FILE_NAME: &str = "gridscan.toml";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "gridscan";
const APPLICATION: &str = "gridscan";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Flag,
    Environment,
    UserDefault,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Flag => f.write_str("--config"),
            ConfigSource::Environment => write!(f, "${ENV_CONFIG}"),
            ConfigSource::UserDefault => f.write_str("user config directory"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocation {
    path: PathBuf,
    source: ConfigSource,
}

impl ConfigLocation {
    pub fn resolve(flag: Option<&Path>) -> Result<Self> {
        if let Some(path) = flag {
            return Ok(Self {
                path: path.to_path_buf(),
                source: ConfigSource::Flag,
            });
        }
        if let Some(path) = env_override(ENV_CONFIG) {
            return Ok(Self {
                path,
                source: ConfigSource::Environment,
            });
        }
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or_else(|| anyhow!("failed to determine user directories"))?;
        Ok(Self {
            path: project_dirs.config_dir().join(CONFIG_FILE_NAME),
            source: ConfigSource::UserDefault,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// An explicitly named file has to exist; the user default is optional.
    pub fn is_required(&self) -> bool {
        self.source != ConfigSource::UserDefault
    }
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_wins_and_is_required() {
        let location = ConfigLocation::resolve(Some(Path::new("/tmp/custom.toml"))).unwrap();
        assert_eq!(location.path(), Path::new("/tmp/custom.toml"));
        assert_eq!(location.source(), ConfigSource::Flag);
        assert!(location.is_required());
    }

    #[test]
    fn sources_describe_themselves() {
        assert_eq!(ConfigSource::Environment.to_string(), "$GRIDSCAN_CONFIG");
        assert_eq!(ConfigSource::Flag.to_string(), "--config");
    }
}
