//! Home directory and settings path resolution
//!
//! The platform-specific lookup lives behind [`HomeDirResolver`];
//! [`PlatformHome`] picks the implementation for the build target.

use crate::config::defaults::SETTINGS_FILE_NAME;
use crate::error::{HydraError, Result};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Environment lookup used by the resolvers
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

fn process_env() -> EnvLookup {
    Arc::new(|key: &str| std::env::var(key).ok())
}

/// Locates the current user's home directory
pub trait HomeDirResolver: Send + Sync {
    fn home_dir(&self) -> Option<PathBuf>;
}

/// `HOMEDRIVE` + `HOMEPATH`, falling back to `USERPROFILE`
#[derive(Clone)]
pub struct WindowsHome {
    lookup: EnvLookup,
}

impl WindowsHome {
    pub fn from_env() -> Self {
        Self {
            lookup: process_env(),
        }
    }

    pub fn with_lookup(lookup: EnvLookup) -> Self {
        Self { lookup }
    }

    fn var(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.is_empty())
    }
}

impl HomeDirResolver for WindowsHome {
    fn home_dir(&self) -> Option<PathBuf> {
        match (self.var("HOMEDRIVE"), self.var("HOMEPATH")) {
            (Some(drive), Some(path)) => Some(PathBuf::from(format!("{}{}", drive, path))),
            _ => self.var("USERPROFILE").map(PathBuf::from),
        }
    }
}

/// Last-resort home lookup consulted when `HOME` is unset
pub type HomeFallback = fn() -> Option<PathBuf>;

fn no_fallback() -> Option<PathBuf> {
    None
}

/// `HOME`, falling back to the user database via `dirs`
#[derive(Clone)]
pub struct UnixHome {
    lookup: EnvLookup,
    fallback: HomeFallback,
}

impl UnixHome {
    pub fn from_env() -> Self {
        Self {
            lookup: process_env(),
            fallback: dirs::home_dir,
        }
    }

    /// Resolver over `lookup` only; no fallback is consulted
    pub fn with_lookup(lookup: EnvLookup) -> Self {
        Self {
            lookup,
            fallback: no_fallback,
        }
    }

    pub fn with_fallback(mut self, fallback: HomeFallback) -> Self {
        self.fallback = fallback;
        self
    }
}

impl HomeDirResolver for UnixHome {
    fn home_dir(&self) -> Option<PathBuf> {
        (self.lookup)("HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(self.fallback)
            .filter(|p| !p.as_os_str().is_empty())
    }
}

#[cfg(windows)]
pub type PlatformHome = WindowsHome;

#[cfg(not(windows))]
pub type PlatformHome = UnixHome;

/// Absolute, cleaned path of the settings file under the resolved home
pub fn config_path(resolver: &dyn HomeDirResolver) -> Result<PathBuf> {
    let home = resolver
        .home_dir()
        .ok_or_else(|| HydraError::config_path("home directory is not set"))?;
    absolute_clean(&home.join(SETTINGS_FILE_NAME))
}

/// Make `path` absolute against the working directory and clean it lexically
pub fn absolute_clean(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(clean_path(path));
    }

    let cwd = std::env::current_dir()
        .map_err(|e| HydraError::config_path(format!("{} ({})", path.display(), e)))?;
    Ok(clean_path(&cwd.join(path)))
}

/// Remove `.` components and collapse `..` without touching the filesystem
pub fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match cleaned.components().next_back() {
                Some(Component::Normal(_)) => {
                    cleaned.pop();
                }
                // `..` at the root stays at the root
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => cleaned.push(".."),
            },
            other => cleaned.push(other.as_os_str()),
        }
    }

    if cleaned.as_os_str().is_empty() {
        cleaned.push(".");
    }
    cleaned
}
