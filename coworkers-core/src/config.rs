//! Settings and account persistence.
//!
//! # Storage layout
//!
//! ```text
//! ~/.coworkers/
//!   settings.yaml   (sync preferences; defaults when absent)
//!   account.yaml    (directory endpoint + credentials, mode 0600)
//! ```
//!
//! # API pattern
//!
//! Every function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// 1. Types
// ---------------------------------------------------------------------------

/// How often the next pass is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncFrequency {
    #[default]
    Weekly,
    Monthly,
}

impl fmt::Display for SyncFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncFrequency::Weekly => write!(f, "weekly"),
            SyncFrequency::Monthly => write!(f, "monthly"),
        }
    }
}

impl FromStr for SyncFrequency {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(invalid("sync_frequency", other, "weekly, monthly")),
        }
    }
}

/// Photo sync policy: off, unmetered networks only, or any network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PhotoSync {
    #[default]
    #[serde(rename = "none")]
    Disabled,
    #[serde(rename = "unmetered")]
    UnmeteredOnly,
    #[serde(rename = "any")]
    Any,
}

impl PhotoSync {
    pub fn enabled(self) -> bool {
        !matches!(self, PhotoSync::Disabled)
    }

    pub fn allows_metered(self) -> bool {
        matches!(self, PhotoSync::Any)
    }
}

impl fmt::Display for PhotoSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhotoSync::Disabled => write!(f, "none"),
            PhotoSync::UnmeteredOnly => write!(f, "unmetered"),
            PhotoSync::Any => write!(f, "any"),
        }
    }
}

impl FromStr for PhotoSync {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::Disabled),
            "unmetered" => Ok(Self::UnmeteredOnly),
            "any" => Ok(Self::Any),
            other => Err(invalid("photos", other, "none, unmetered, any")),
        }
    }
}

/// User preferences read by every pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub group_title: String,
    pub sync_frequency: SyncFrequency,
    pub photos: PhotoSync,
    pub prefer_native_names: bool,
    pub notifications: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            group_title: "Coworkers".to_string(),
            sync_frequency: SyncFrequency::default(),
            photos: PhotoSync::default(),
            prefer_native_names: false,
            notifications: false,
        }
    }
}

impl Settings {
    /// Keys accepted by [`Settings::set`], in display order.
    pub const KEYS: [&'static str; 5] = [
        "group_title",
        "sync_frequency",
        "photos",
        "prefer_native_names",
        "notifications",
    ];

    /// Sets one key from its string form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "group_title" => {
                if value.trim().is_empty() {
                    return Err(invalid(key, value, "a non-empty title"));
                }
                self.group_title = value.to_string();
            }
            "sync_frequency" => self.sync_frequency = value.parse()?,
            "photos" => self.photos = value.parse()?,
            "prefer_native_names" => self.prefer_native_names = parse_bool(key, value)?,
            "notifications" => self.notifications = parse_bool(key, value)?,
            other => return Err(invalid("key", other, "one of Settings::KEYS")),
        }
        Ok(())
    }

    /// `(key, value)` pairs for display.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("group_title", self.group_title.clone()),
            ("sync_frequency", self.sync_frequency.to_string()),
            ("photos", self.photos.to_string()),
            ("prefer_native_names", self.prefer_native_names.to_string()),
            ("notifications", self.notifications.to_string()),
        ]
    }
}

/// The single directory account: where to fetch employees and how to
/// authenticate.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub password: String,
    pub endpoint: String,
}

impl Account {
    pub fn name(&self) -> &str {
        &self.username
    }

    /// File-name-safe form of the account name, used to key per-account
    /// state on disk.
    ///
    /// ASCII letters, digits and `-` are kept; every other byte becomes
    /// `_xx` (lowercase hex). Distinct names give distinct keys and a key
    /// never contains a dot or a path separator.
    pub fn key(&self) -> String {
        if self.username.is_empty() {
            return "_".to_string();
        }
        let mut key = String::with_capacity(self.username.len());
        for byte in self.username.bytes() {
            match byte {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' => key.push(char::from(byte)),
                _ => key.push_str(&format!("_{byte:02x}")),
            }
        }
        key
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("username", &self.username)
            .field("password", &"***")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// 2. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.coworkers/`
pub fn root_at(home: &Path) -> PathBuf {
    home.join(".coworkers")
}

/// `<home>/.coworkers/settings.yaml`
pub fn settings_path_at(home: &Path) -> PathBuf {
    root_at(home).join("settings.yaml")
}

/// `<home>/.coworkers/account.yaml`
pub fn account_path_at(home: &Path) -> PathBuf {
    root_at(home).join("account.yaml")
}

// ---------------------------------------------------------------------------
// 3. Settings
// ---------------------------------------------------------------------------

/// Load settings; a missing file yields [`Settings::default`].
pub fn load_settings_at(home: &Path) -> Result<Settings, ConfigError> {
    let path = settings_path_at(home);
    if !path.exists() {
        return Ok(Settings::default());
    }
    let contents = std::fs::read_to_string(&path)?;
    if contents.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })
}

/// `load_settings_at` convenience wrapper.
pub fn load_settings() -> Result<Settings, ConfigError> {
    load_settings_at(&home()?)
}

pub fn save_settings_at(home: &Path, settings: &Settings) -> Result<(), ConfigError> {
    let yaml = serde_yaml::to_string(settings)?;
    write_atomic(&settings_path_at(home), &yaml)
}

/// `save_settings_at` convenience wrapper.
pub fn save_settings(settings: &Settings) -> Result<(), ConfigError> {
    save_settings_at(&home()?, settings)
}

// ---------------------------------------------------------------------------
// 4. Account
// ---------------------------------------------------------------------------

/// The configured account, if any.
pub fn find_account_at(home: &Path) -> Result<Option<Account>, ConfigError> {
    let path = account_path_at(home);
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents)
        .map(Some)
        .map_err(|e| ConfigError::Parse { path, source: e })
}

/// The configured account; [`ConfigError::AccountMissing`] when absent.
pub fn load_account_at(home: &Path) -> Result<Account, ConfigError> {
    find_account_at(home)?.ok_or_else(|| ConfigError::AccountMissing {
        path: account_path_at(home),
    })
}

/// `load_account_at` convenience wrapper.
pub fn load_account() -> Result<Account, ConfigError> {
    load_account_at(&home()?)
}

/// Save a new account. Only one account may exist at a time.
pub fn create_account_at(home: &Path, account: &Account) -> Result<(), ConfigError> {
    let path = account_path_at(home);
    if path.exists() {
        return Err(ConfigError::AccountExists { path });
    }
    let yaml = serde_yaml::to_string(account)?;
    write_atomic(&path, &yaml)
}

/// Remove the account file. Returns `false` if there was none.
pub fn remove_account_at(home: &Path) -> Result<bool, ConfigError> {
    let path = account_path_at(home);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Resolve the user's home directory.
pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

/// serialize → `.tmp` sibling → `chmod 0600` → `rename`.
fn write_atomic(path: &Path, contents: &str) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            set_dir_permissions(dir)?;
        }
    }
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, contents)?;
    set_file_permissions(&tmp)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(key, value, "true or false")),
    }
}

fn invalid(key: &str, value: &str, expected: &'static str) -> ConfigError {
    ConfigError::InvalidSetting {
        key: key.to_string(),
        value: value.to_string(),
        expected,
    }
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
