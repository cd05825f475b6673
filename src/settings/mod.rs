//! alsacontrol settings handling
//!
//! The settings live in a flat `key=value` file under the user's
//! config directory (`~/.config/alsacontrol/config`).  The file is
//! meant to be hand editable, so writes only ever touch the line of
//! the key that changed and leave comments and unknown keys alone.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let config = Config::load_default()?;
//! config.set("output_use_dmix", false)?;
//! assert_eq!(config.get_bool("output_use_dmix"), Some(false));
//! ```
//!
//! A missing file is created and populated with [`defaults`].

mod keys;
pub use keys::*;

use crate::error::{Error, Result};
use crate::model::Stream;
use directories::ProjectDirs;
use std::{
    collections::BTreeMap,
    fmt::Display,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use tracing::{debug, info};

/// Find (and create) `~/.config/alsacontrol`
pub fn scaffold() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "alsacontrol")
        .ok_or_else(|| Error::Config("could not determine the home directory".into()))?;
    let dir = dirs.config_dir().to_path_buf();
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// In-memory view of the config file
#[derive(Debug)]
pub struct Config {
    path: PathBuf,
    values: RwLock<BTreeMap<String, Option<String>>>,
}

impl Config {
    /// Open the config in the default location
    pub fn load_default() -> Result<Arc<Self>> {
        Self::open(scaffold()?.join("config"))
    }

    /// Open a config file, writing the defaults if it doesn't exist yet
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Arc<Self>> {
        let this = Arc::new(Self {
            path: path.as_ref().to_path_buf(),
            values: RwLock::new(BTreeMap::new()),
        });

        if !this.path.exists() {
            if let Some(parent) = this.path.parent() {
                fs::create_dir_all(parent)?;
            }
            info!("Creating config file \"{}\"", this.path.display());
            OpenOptions::new()
                .write(true)
                .create(true)
                .open(&this.path)?;
            for (key, value) in defaults().iter() {
                this.set(key, value)?;
            }
        }

        this.load()?;
        Ok(this)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the config file, dropping everything held in memory
    pub fn load(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        *self.w() = parse_config(&contents);
        Ok(())
    }

    /// Read a value, `None` if the key is missing or has no value
    pub fn get(&self, key: &str) -> Option<String> {
        self.r().get(key).cloned().flatten()
    }

    /// All settings in key order
    pub fn entries(&self) -> Vec<(String, Option<String>)> {
        self.r()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).map(|v| parse_bool(&v))
    }

    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    /// Write a setting into memory and the config file
    ///
    /// Returns `false` without touching the file if the key already
    /// holds this value.
    pub fn set<V: Display>(&self, key: &str, value: V) -> Result<bool> {
        let value = value.to_string();
        if key.is_empty() || key.contains('=') || key.contains('\n') || value.contains('\n') {
            return Err(Error::Config(format!("invalid setting \"{}={}\"", key, value)));
        }

        let mut values = self.w();
        if values.get(key) == Some(&Some(value.clone())) {
            debug!("Setting \"{}\" is already \"{}\"", key, value);
            return Ok(false);
        }

        let contents = fs::read_to_string(&self.path)?;
        let mut contents = modify_config(&contents, key, &value);
        if !contents.ends_with('\n') {
            contents.push('\n');
        }
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .and_then(|mut f| f.write_all(contents.as_bytes()))?;

        values.insert(key.to_owned(), Some(value));
        Ok(true)
    }

    /// The pcm configured for a stream, `null` when nothing is selected
    pub fn pcm(&self, stream: Stream) -> String {
        self.get(pcm_key(stream)).unwrap_or_else(|| NULL_PCM.to_owned())
    }

    pub fn plugin(&self, stream: Stream) -> String {
        self.get(plugin_key(stream))
            .unwrap_or_else(|| DEFAULT_PLUGIN.to_owned())
    }

    pub fn use_softvol(&self, stream: Stream) -> bool {
        self.get_bool(softvol_key(stream)).unwrap_or(false)
    }

    /// dmix for outputs, dsnoop for inputs
    pub fn use_sharing(&self, stream: Stream) -> bool {
        self.get_bool(sharing_key(stream)).unwrap_or(false)
    }

    pub fn num_output_channels(&self) -> u32 {
        self.get_u32(NUM_OUTPUT_CHANNELS).unwrap_or(DEFAULT_CHANNELS)
    }

    fn r(&self) -> RwLockReadGuard<'_, BTreeMap<String, Option<String>>> {
        self.values.read().unwrap_or_else(|e| e.into_inner())
    }

    fn w(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Option<String>>> {
        self.values.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Parse the contents of a config file
fn parse_config(contents: &str) -> BTreeMap<String, Option<String>> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| match line.find('=') {
            Some(i) => (line[..i].to_owned(), Some(line[i + 1..].to_owned())),
            None => (line.to_owned(), None),
        })
        .collect()
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

/// Write a setting into the contents of a config file
///
/// The first uncommented `key=` line is replaced, otherwise the setting
/// is appended.  All other lines stay as they are.
pub fn modify_config(contents: &str, key: &str, value: &str) -> String {
    info!("Setting \"{}\" to \"{}\"", key, value);
    let mut lines: Vec<String> = contents.split('\n').map(str::to_owned).collect();
    if lines.last().map(String::is_empty).unwrap_or(false) {
        lines.pop();
    }

    let setting = format!("{}={}", key, value);
    let prefix = format!("{}=", key);
    let found = lines.iter().position(|line| {
        let line = line.trim();
        !line.starts_with('#') && line.starts_with(&prefix)
    });

    match found {
        Some(i) => {
            debug!("Overwriting \"{}\" in config", setting);
            lines[i] = setting;
        }
        None => {
            debug!("Adding \"{}\" to config", setting);
            lines.push(setting);
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const CONTENTS: &str = "a=1\n # test=3\n  abc=123";

    #[test]
    fn replaces_first_line() {
        assert_eq!(
            modify_config(CONTENTS, "a", "3"),
            "a=3\n # test=3\n  abc=123"
        );
    }

    #[test]
    fn replaces_last_line() {
        assert_eq!(
            modify_config(CONTENTS, "abc", "foo"),
            "a=1\n # test=3\nabc=foo"
        );
    }

    #[test]
    fn commented_key_is_appended() {
        assert_eq!(
            modify_config(CONTENTS, "test", "1234"),
            "a=1\n # test=3\n  abc=123\ntest=1234"
        );
    }

    #[test]
    fn prefix_of_other_key_is_not_matched() {
        assert_eq!(modify_config("abc=1\n", "ab", "2"), "abc=1\nab=2");
    }

    #[test]
    fn parses_keys_without_values() {
        let parsed = parse_config("# comment\nflag\n\nkey=a=b\n");
        assert_eq!(parsed.get("flag"), Some(&None));
        assert_eq!(parsed.get("key"), Some(&Some("a=b".to_owned())));
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn creates_file_with_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::open(dir.path().join("nested").join("config")).unwrap();

        assert_eq!(config.pcm(Stream::Input), "null");
        assert_eq!(config.pcm(Stream::Output), "null");
        assert!(config.use_softvol(Stream::Output));
        assert!(config.use_sharing(Stream::Input));
        assert_eq!(config.plugin(Stream::Output), "hw");
        assert_eq!(config.num_output_channels(), 2);

        let written = fs::read_to_string(config.path()).unwrap();
        assert!(written.ends_with('\n'));
        assert!(written.contains("output_use_dmix=true\n"));
    }

    #[test]
    fn set_then_get_returns_value() {
        let dir = tempdir().unwrap();
        let config = Config::open(dir.path().join("config")).unwrap();

        assert!(config.set("pcm_output", "hw:CARD=Generic").unwrap());
        assert_eq!(config.get("pcm_output").as_deref(), Some("hw:CARD=Generic"));

        // and survives a reload from disk
        config.load().unwrap();
        assert_eq!(config.get("pcm_output").as_deref(), Some("hw:CARD=Generic"));
    }

    #[test]
    fn setting_same_value_is_a_noop() {
        let dir = tempdir().unwrap();
        let config = Config::open(dir.path().join("config")).unwrap();
        assert!(config.set("custom", 5).unwrap());
        assert!(!config.set("custom", 5).unwrap());
    }

    #[test]
    fn keeps_hand_written_comments() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config");
        fs::write(&path, "# my card\npcm_output=hw:CARD=PCH\n").unwrap();

        let config = Config::open(&path).unwrap();
        config.set("pcm_output", "hw:CARD=USB").unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "# my card\npcm_output=hw:CARD=USB\n"
        );
    }

    #[test]
    fn rejects_multiline_values() {
        let dir = tempdir().unwrap();
        let config = Config::open(dir.path().join("config")).unwrap();
        assert!(config.set("key", "a\nb").is_err());
    }
}
