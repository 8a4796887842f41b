//! Backend binary discovery.
//!
//! Search order: explicit configured path, environment override (binary or
//! containing directory), then per-platform conventional locations. The first
//! candidate that exists and is a regular file wins.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Executable name of the modeling backend.
pub const MODELING_BINARY: &str = "PowerBI.ModelingMcp.Server.exe";

/// Environment override for the modeling backend location.
pub const MODELING_PATH_ENV: &str = "POWERBI_MCP_PATH";

/// Prefix of the IDE extension folders that bundle the modeling backend.
const EXTENSION_PREFIX: &str = "microsoft.powerbi-vscode";

/// Subdirectories of an extension folder that may hold the binary.
const EXTENSION_SUBDIRS: &[&str] = &["dist", "bin", ""];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    /// An explicitly configured path does not name a regular file.
    #[error("configured backend path {} does not exist or is not a file", .path.display())]
    InvalidPath { path: PathBuf },

    #[error("could not locate {binary}; searched: {}", SearchList(.searched))]
    NotFound { binary: String, searched: Vec<PathBuf> },
}

struct SearchList<'a>(&'a [PathBuf]);

impl fmt::Display for SearchList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("(no candidates)");
        }
        for (i, path) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", path.display())?;
        }
        Ok(())
    }
}

/// Inputs to discovery beyond the explicit configured path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryInputs {
    /// Value of the environment override, if set.
    pub env_override: Option<PathBuf>,
    /// Conventional install locations, in priority order.
    pub candidates: Vec<PathBuf>,
}

impl DiscoveryInputs {
    /// Read the environment override and platform locations for the
    /// modeling backend.
    pub fn from_env() -> Self {
        Self {
            env_override: std::env::var_os(MODELING_PATH_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            candidates: platform_candidates(MODELING_BINARY),
        }
    }

    /// No override and no conventional locations.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_env_override(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_override = Some(path.into());
        self
    }

    pub fn with_candidates(mut self, candidates: Vec<PathBuf>) -> Self {
        self.candidates = candidates;
        self
    }
}

/// Whether `path` exists and is a regular file.
pub fn is_valid_binary(path: &Path) -> bool {
    path.is_file()
}

/// Validate an explicitly configured path.
pub fn validate_binary_path(path: &Path) -> Result<PathBuf, DiscoveryError> {
    if is_valid_binary(path) {
        Ok(path.to_path_buf())
    } else {
        Err(DiscoveryError::InvalidPath {
            path: path.to_path_buf(),
        })
    }
}

/// Resolve the backend binary.
///
/// An explicit path that fails validation is an error; it never falls back
/// to the other inputs.
pub fn discover_binary(
    explicit: Option<&Path>,
    inputs: &DiscoveryInputs,
    binary: &str,
) -> Result<PathBuf, DiscoveryError> {
    if let Some(path) = explicit {
        return validate_binary_path(path);
    }

    let mut searched = Vec::new();

    if let Some(env_path) = &inputs.env_override {
        let candidate = if env_path.is_dir() {
            env_path.join(binary)
        } else {
            env_path.clone()
        };
        if is_valid_binary(&candidate) {
            tracing::debug!(path = %candidate.display(), "backend found via environment override");
            return Ok(candidate);
        }
        searched.push(candidate);
    }

    for candidate in &inputs.candidates {
        if is_valid_binary(candidate) {
            tracing::debug!(path = %candidate.display(), "backend found in conventional location");
            return Ok(candidate.clone());
        }
        searched.push(candidate.clone());
    }

    Err(DiscoveryError::NotFound {
        binary: binary.to_string(),
        searched,
    })
}

/// Conventional install locations for `binary` on this platform.
pub fn platform_candidates(binary: &str) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(home) = dirs::home_dir() {
        candidates.extend(extension_candidates(&home.join(".vscode").join("extensions"), binary));
    }

    if cfg!(windows) {
        let program_files = std::env::var_os("ProgramFiles")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(r"C:\Program Files"));
        let program_files_x86 = std::env::var_os("ProgramFiles(x86)")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(r"C:\Program Files (x86)"));

        for root in [program_files, program_files_x86] {
            candidates.push(
                root.join("Microsoft")
                    .join("Power BI Desktop")
                    .join("bin")
                    .join(binary),
            );
        }
        if let Some(local) = dirs::data_local_dir() {
            candidates.push(local.join("Microsoft").join("PowerBI Desktop").join(binary));
        }
    }

    candidates
}

/// Candidate paths inside matching IDE extension folders, highest version
/// first.
pub fn extension_candidates(extensions_dir: &Path, binary: &str) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(extensions_dir) else {
        return Vec::new();
    };

    let mut folders: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_dir()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.to_ascii_lowercase().starts_with(EXTENSION_PREFIX))
                    .unwrap_or(false)
        })
        .collect();
    folders.sort_by_cached_key(|path| std::cmp::Reverse((extension_version(path), path.clone())));

    folders
        .iter()
        .flat_map(|folder| {
            EXTENSION_SUBDIRS.iter().map(move |sub| {
                if sub.is_empty() {
                    folder.join(binary)
                } else {
                    folder.join(sub).join(binary)
                }
            })
        })
        .collect()
}

/// Numeric version components of an extension folder name, so that
/// `microsoft.powerbi-vscode-1.10.0-win32-x64` sorts above `...-1.9.0`.
fn extension_version(folder: &Path) -> Vec<u32> {
    let name = folder
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    name.strip_prefix(EXTENSION_PREFIX)
        .unwrap_or_default()
        .trim_start_matches('-')
        .split(['.', '-'])
        .map_while(|part| part.parse().ok())
        .collect()
}
