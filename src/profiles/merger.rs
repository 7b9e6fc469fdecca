use crate::error::{Error, Result};
use crate::profiles::Profile;
use configparser::ini::Ini;
use log::info;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Keys outside any `[section]` header land here and are written back
/// without a header, which keeps a real `[default]` profile intact.
const ROOT_SECTION: &str = "__assume_profiles_root__";

const DIR_MODE: u32 = 0o700;
const FILE_MODE: u32 = 0o600;

/// A section name and its complete list of entries, in write order.
pub type Section = (String, Vec<(String, String)>);

/// An ini file held in memory. Saving rewrites the whole file, so comments
/// and formatting of the original do not survive.
pub struct ConfigStore {
    path: PathBuf,
    ini: Ini,
}

impl ConfigStore {
    /// Creates the parent directory and the file with owner-only access if
    /// they are missing, then parses whatever is there.
    pub fn load(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| Error::config_io(dir, e))?;
            restrict_mode(dir, DIR_MODE)?;
        }
        if !path.exists() {
            create_private_file(path)?;
        }
        restrict_mode(path, FILE_MODE)?;

        let mut ini = Ini::new_cs();
        ini.set_default_section(ROOT_SECTION);
        // Values such as `start#/` or `cmd --x;y` must survive a rewrite, and
        // indented blocks (`s3 =` sub-settings) stay attached to their key.
        ini.set_inline_comment_symbols(Some(&[]));
        ini.set_multiline(true);
        ini.load(path).map_err(|e| {
            Error::config_io(path, io::Error::new(io::ErrorKind::InvalidData, e))
        })?;

        Ok(ConfigStore {
            path: path.to_path_buf(),
            ini,
        })
    }

    /// Replaces the section's entries wholesale. An existing section keeps
    /// its position in the file; a new one is appended.
    pub fn upsert(&mut self, section: &str, entries: &[(String, String)]) {
        let map = self.ini.get_mut_map();
        let existing = map.entry(section.to_string()).or_default();
        existing.clear();
        for (key, value) in entries {
            existing.insert(key.clone(), Some(value.clone()));
        }
    }

    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        self.ini.get(section, key)
    }

    pub fn sections(&self) -> Vec<String> {
        self.ini
            .sections()
            .into_iter()
            .filter(|section| section != ROOT_SECTION)
            .collect()
    }

    pub fn contents(&self) -> String {
        self.ini.writes()
    }

    /// Rewrites the file in place. Not atomic: an interrupted write can leave
    /// a truncated file behind.
    pub fn save(&self) -> Result<()> {
        fs::write(&self.path, self.contents()).map_err(|e| Error::config_io(&self.path, e))
    }
}

/// Upserts one section per profile into the file at `path`. Sections of
/// profiles outside the batch are left alone.
pub fn update<F>(profiles: &[Profile], path: &Path, section_builder: F) -> Result<()>
where
    F: Fn(&Profile) -> Section,
{
    let mut store = ConfigStore::load(path)?;
    for profile in profiles {
        let (section, entries) = section_builder(profile);
        store.upsert(&section, &entries);
    }

    info!("Writing {} profiles to {}", profiles.len(), path.display());
    store.save()
}

/// `[profile {name}]` with the profile's region, for the `config` file.
pub fn config_section(profile: &Profile) -> Section {
    (
        format!("profile {}", profile.name),
        vec![(String::from("region"), profile.region.clone())],
    )
}

/// `[{name}]` with the key material, for the `credentials` file.
pub fn credentials_section(profile: &Profile) -> Section {
    (
        profile.name.clone(),
        vec![
            (
                String::from("aws_access_key_id"),
                profile.credentials.access_key_id.clone(),
            ),
            (
                String::from("aws_secret_access_key"),
                profile.credentials.secret_access_key.clone(),
            ),
            (
                String::from("aws_session_token"),
                profile.credentials.session_token.clone(),
            ),
        ],
    )
}

#[cfg(unix)]
fn create_private_file(path: &Path) -> Result<()> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .mode(FILE_MODE)
        .open(path)
        .map(|_| ())
        .map_err(|e| Error::config_io(path, e))
}

#[cfg(not(unix))]
fn create_private_file(path: &Path) -> Result<()> {
    fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(path)
        .map(|_| ())
        .map_err(|e| Error::config_io(path, e))
}

/// Drops every permission bit outside `mask`; never adds one.
#[cfg(unix)]
fn restrict_mode(path: &Path, mask: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let current = fs::metadata(path)
        .map_err(|e| Error::config_io(path, e))?
        .permissions()
        .mode()
        & 0o777;
    let restricted = current & mask;
    if restricted != current {
        fs::set_permissions(path, fs::Permissions::from_mode(restricted))
            .map_err(|e| Error::config_io(path, e))?;
    }

    Ok(())
}

#[cfg(not(unix))]
fn restrict_mode(_path: &Path, _mask: u32) -> Result<()> {
    Ok(())
}
