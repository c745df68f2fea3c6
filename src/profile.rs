//! Browser profile handling
//!
//! Normalizes the caller-supplied profile directory, installs extension
//! archives into it, and appends `user_pref` lines to the profile's
//! persisted preference store.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use regex::Regex;
use tempfile::TempDir;

use crate::common::{Error, Result};

/// The active profile for one run.
///
/// When the runner had to fall back to a temporary profile, the `TempDir`
/// guard lives here so the directory survives until supervision ends.
#[derive(Debug)]
pub struct Profile {
    path: PathBuf,
    _temp: Option<TempDir>,
}

impl Profile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this run is using a throwaway temporary profile
    pub fn is_temporary(&self) -> bool {
        self._temp.is_some()
    }
}

/// Resolve the profile to run against.
///
/// A supplied path that exists is used as-is. A supplied path that does not
/// exist is not an error: the run falls back to a fresh temporary profile,
/// matching how an unattended test bot has to behave.
pub fn prepare(requested: Option<&Path>) -> Result<Profile> {
    match requested {
        Some(path) if path.exists() => Ok(Profile {
            path: path.to_path_buf(),
            _temp: None,
        }),
        Some(path) => {
            tracing::warn!(
                "Profile '{}' doesn't exist. Creating temporary profile",
                path.display()
            );
            temporary()
        }
        None => temporary(),
    }
}

fn temporary() -> Result<Profile> {
    let temp = TempDir::with_prefix("fbtest-profile-")?;
    Ok(Profile {
        path: temp.path().to_path_buf(),
        _temp: Some(temp),
    })
}

/// Install extension archives into the profile's `extensions/` directory.
///
/// Firefox only picks up an extension whose file is named `<addon id>.xpi`,
/// so the id is read out of each archive's `install.rdf` first.
pub fn install_extensions(profile: &Path, xpis: &[PathBuf]) -> Result<()> {
    let ext_dir = profile.join("extensions");
    fs::create_dir_all(&ext_dir)?;

    for xpi in xpis {
        let id = addon_id(xpi)?;
        let dest = ext_dir.join(format!("{}.xpi", id));
        tracing::debug!("Installing '{}' as '{}'", xpi.display(), dest.display());
        fs::copy(xpi, &dest)?;
    }
    Ok(())
}

/// Extract the `em:id` of an extension from the install.rdf inside its archive
pub fn addon_id(xpi: &Path) -> Result<String> {
    let file = fs::File::open(xpi)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| {
        Error::Config(format!("'{}' is not a valid xpi: {}", xpi.display(), e))
    })?;

    let mut manifest = String::new();
    archive
        .by_name("install.rdf")
        .map_err(|e| {
            Error::Config(format!("'{}' has no install.rdf: {}", xpi.display(), e))
        })?
        .read_to_string(&mut manifest)?;

    parse_addon_id(&manifest).ok_or_else(|| {
        Error::Config(format!("No em:id found in '{}'", xpi.display()))
    })
}

/// Pull the em:id out of an install.rdf manifest, in either element or
/// attribute form
pub fn parse_addon_id(manifest: &str) -> Option<String> {
    let element = Regex::new(r"<em:id>\s*([^<\s]+)\s*</em:id>").ok()?;
    if let Some(caps) = element.captures(manifest) {
        return Some(caps[1].to_string());
    }
    let attribute = Regex::new(r#"em:id\s*=\s*"([^"]+)""#).ok()?;
    attribute.captures(manifest).map(|caps| caps[1].to_string())
}

/// Append one `user_pref` line to the profile's prefs.js
pub fn append_pref(profile: &Path, name: &str, value: &str) -> Result<()> {
    let mut prefs = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(profile.join("prefs.js"))?;
    writeln!(prefs, "user_pref(\"{}\", {});", name, value)?;
    Ok(())
}
