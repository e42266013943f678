//! Path helpers for ladle data directories and workspace-relative paths.
//!
//! | Directory | Default | Override |
//! |-----------|---------|----------|
//! | Config | `<config dir>/ladle` | `LADLE_CONFIG_DIR` |
//! | Package store | `~/.soup/packages` | `packageStore` config key |
//! | Lock store | `~/.soup/locks` | `lockStore` config key |

use crate::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Get the directory holding `config.toml`.
///
/// Resolution order:
/// 1. `LADLE_CONFIG_DIR` environment variable
/// 2. Platform config directory + `/ladle`
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("LADLE_CONFIG_DIR")
        && !dir.is_empty()
    {
        return Ok(PathBuf::from(dir));
    }

    let base = dirs::config_dir()
        .ok_or_else(|| Error::configuration("Could not determine config directory"))?;
    Ok(base.join("ladle"))
}

/// Get the `~/.soup` directory that holds the package and lock stores.
pub fn user_data_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| Error::configuration("Could not determine home directory"))?;
    Ok(home.join(".soup"))
}

/// Lexically normalize a path: drop `.` components and fold `..` into its parent.
///
/// Symlinks are not resolved. Two spellings of one directory normalize to
/// the same path as long as they do not traverse links.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(
                    result.components().next_back(),
                    Some(Component::Normal(_))
                ) && result.pop();
                if !popped && !result.has_root() {
                    result.push("..");
                }
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

/// Express `path` relative to `base`, both normalized first.
#[must_use]
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let path = normalize(path);
    let base = normalize(base);

    let path_components: Vec<_> = path.components().collect();
    let base_components: Vec<_> = base.components().collect();
    let common = path_components
        .iter()
        .zip(&base_components)
        .take_while(|(a, b)| a == b)
        .count();

    let mut result = PathBuf::new();
    for _ in common..base_components.len() {
        result.push("..");
    }
    for component in &path_components[common..] {
        result.push(component.as_os_str());
    }
    result
}

/// Render a relative directory the way lock documents store it.
///
/// Always `./` or `../` prefixed, `/` separated and `/` terminated, so a
/// locked path can never be mistaken for a version.
#[must_use]
pub fn to_lock_path(relative: &Path) -> String {
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    let mut value = if parts.first().is_some_and(|p| p == "..") {
        String::new()
    } else {
        String::from("./")
    };
    for part in parts {
        value.push_str(&part);
        value.push('/');
    }
    value
}
