//! Target scope of a run: working directory plus the paths handed to tools

use crate::core::error::ConfigError;
use std::path::{Path, PathBuf};

/// Literal scope argument meaning "every configured path"
pub const ALL_SCOPE: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    /// Directory every step runs in (unless it overrides it)
    pub root: PathBuf,

    /// Paths passed to each tool, relative to `root` where possible
    pub paths: Vec<PathBuf>,
}

impl Scope {
    pub fn new(root: impl Into<PathBuf>, paths: Vec<PathBuf>) -> Self {
        Self {
            root: root.into(),
            paths,
        }
    }

    /// Resolve a scope argument (`None`, `"all"` or a single path) against the
    /// configured default paths.
    pub fn resolve(
        root: &Path,
        argument: Option<&str>,
        default_paths: &[PathBuf],
    ) -> Result<Self, ConfigError> {
        if !root.is_dir() {
            return Err(ConfigError::InvalidScope(format!(
                "root directory {} does not exist",
                root.display()
            )));
        }

        let paths = match argument.map(str::trim) {
            None | Some(ALL_SCOPE) => {
                if default_paths.is_empty() {
                    vec![PathBuf::from(".")]
                } else {
                    default_paths.to_vec()
                }
            }
            Some("") => {
                return Err(ConfigError::InvalidScope("empty scope argument".to_string()));
            }
            Some(path) => vec![PathBuf::from(path)],
        };

        for path in &paths {
            let full = if path.is_absolute() {
                path.clone()
            } else {
                root.join(path)
            };
            if !full.exists() {
                return Err(ConfigError::InvalidScope(format!(
                    "path {} does not exist",
                    full.display()
                )));
            }
        }

        Ok(Self::new(root, paths))
    }

    /// Paths as display strings
    pub fn display_paths(&self) -> Vec<String> {
        self.paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect()
    }
}
