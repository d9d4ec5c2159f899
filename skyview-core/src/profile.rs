//! Credential profile discovery.
//!
//! Profiles are the section names of `~/.aws/credentials` and
//! `~/.aws/config` (where sections read `[profile name]`). The reserved
//! `default` section is never listed; the picker adds it back at the top.
//! Missing files are fine, unreadable ones are not.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub const PROFILE_ENV: &str = "AWS_PROFILE";
pub const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("home directory not found")]
    NoHome,
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Section names in `content`. With `strip_prefix` the `profile ` prefix of
/// config-file sections is removed.
fn sections(content: &str, strip_prefix: bool) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix('[')?.strip_suffix(']'))
        .map(str::trim)
        .map(|name| {
            if strip_prefix {
                name.strip_prefix("profile ").map(str::trim).unwrap_or(name)
            } else {
                name
            }
        })
        .filter(|name| !name.is_empty() && *name != DEFAULT_PROFILE)
        .map(str::to_string)
        .collect()
}

fn read_optional(path: &Path) -> Result<Option<String>, ProfileError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ProfileError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Sorted, de-duplicated profile names under `home`.
pub fn discover_profiles(home: &Path) -> Result<Vec<String>, ProfileError> {
    let dir = home.join(".aws");
    let mut names = BTreeSet::new();
    if let Some(content) = read_optional(&dir.join("credentials"))? {
        names.extend(sections(&content, false));
    }
    if let Some(content) = read_optional(&dir.join("config"))? {
        names.extend(sections(&content, true));
    }
    Ok(names.into_iter().collect())
}

/// Profiles under the user's home directory.
pub fn discover_home_profiles() -> Result<Vec<String>, ProfileError> {
    let home = dirs::home_dir().ok_or(ProfileError::NoHome)?;
    discover_profiles(&home)
}

/// Entries for the picker: `default` first, then the discovered profiles.
pub fn picker_entries(profiles: &[String]) -> Vec<String> {
    std::iter::once(DEFAULT_PROFILE.to_string())
        .chain(profiles.iter().cloned())
        .collect()
}

/// The profile named by the environment, if any.
pub fn active_profile_from_env() -> Option<String> {
    std::env::var(PROFILE_ENV)
        .ok()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
}

pub fn profile_label(profile: Option<&str>) -> &str {
    profile.unwrap_or("unset")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovers_both_files() {
        let home = tempfile::tempdir().unwrap();
        let aws = home.path().join(".aws");
        std::fs::create_dir_all(&aws).unwrap();
        std::fs::write(
            aws.join("credentials"),
            "[default]\naws_access_key_id = x\n\n[staging]\naws_access_key_id = y\n",
        )
        .unwrap();
        std::fs::write(
            aws.join("config"),
            "[default]\nregion = us-east-1\n[profile prod]\nregion = eu-west-1\n[ profile staging ]\n",
        )
        .unwrap();

        let profiles = discover_profiles(home.path()).unwrap();
        assert_eq!(profiles, vec!["prod", "staging"]);
        assert_eq!(picker_entries(&profiles), vec!["default", "prod", "staging"]);
    }

    #[test]
    fn test_missing_files_tolerated() {
        let home = tempfile::tempdir().unwrap();
        assert!(discover_profiles(home.path()).unwrap().is_empty());
    }

    #[test]
    fn test_unreadable_file_is_an_error() {
        let home = tempfile::tempdir().unwrap();
        // A directory where a file is expected fails with something other
        // than NotFound.
        std::fs::create_dir_all(home.path().join(".aws").join("credentials")).unwrap();
        let err = discover_profiles(home.path()).unwrap_err();
        assert!(matches!(err, ProfileError::Read { .. }));
    }

    #[test]
    fn test_profile_label() {
        assert_eq!(profile_label(None), "unset");
        assert_eq!(profile_label(Some("dev")), "dev");
    }
}
