//! Construction options and config-file discovery.
//!
//! An [`Options`] value is consumed once when a [`Silo`](crate::Silo) handle
//! is built; nothing re-reads configuration afterwards. [`Options::load_env`]
//! additionally merges a plain `key=value` file named by the `SILO_CONFIG`
//! environment variable, so scripts can point every invocation at the same
//! store without repeating flags.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Environment variable naming the config file merged by [`Options::load_env`].
pub const CONFIG_ENV: &str = "SILO_CONFIG";

/// Name of the per-database index file, and of the marker file dropped into
/// each shard directory.
pub const INDEX_FILE: &str = "index.json";

/// Engine construction options.
#[derive(Clone, Debug, Serialize)]
pub struct Options {
    /// Root directory holding every logical database.
    pub dir: PathBuf,
    /// Logical database name; alphanumeric only.
    pub dbname: String,
    /// Maximum canonical key length.
    pub key_length: usize,
    /// Default TTL in seconds applied at `set` time when the caller gives
    /// none; 0 disables.
    pub key_expiry: u64,
    /// Upper bound for raw binary payloads, in bytes.
    pub blob_size: u64,
    /// Permission bits for created directories.
    pub dir_mode: u32,
    /// Permission bits for written files.
    pub file_mode: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            dir: env::temp_dir().join("silo"),
            dbname: "db0".to_string(),
            key_length: 150,
            key_expiry: 0,
            blob_size: 5_000_000,
            dir_mode: 0o755,
            file_mode: 0o644,
        }
    }
}

impl Options {
    /// Defaults plus whatever the `SILO_CONFIG` file overrides.
    pub fn load_env() -> Self {
        let mut options = Self::default();
        if let Ok(file) = env::var(CONFIG_ENV) {
            options.merge_config_file(Path::new(&file));
        }
        options
    }

    /// Merge a `key=value` config file: `#` lines are comments, quotes are
    /// stripped, keys are lowercased, values outside the allowed charset
    /// and unknown keys are ignored.
    pub fn merge_config_file(&mut self, path: &Path) {
        let Ok(text) = fs::read_to_string(path) else {
            return;
        };
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.replace(['"', '\''], "");
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();
            if !value.is_empty() && is_valid_value(value) {
                self.apply(&key, value);
            }
        }
    }

    fn apply(&mut self, key: &str, value: &str) {
        match key {
            "dir" => self.dir = PathBuf::from(value),
            "dbname" => {
                if is_valid_dbname(value) {
                    self.dbname = value.to_string();
                }
            }
            "key_length" => {
                if let Ok(n) = value.parse() {
                    if n > 0 {
                        self.key_length = n;
                    }
                }
            }
            "key_expiry" => {
                if let Ok(n) = value.parse() {
                    self.key_expiry = n;
                }
            }
            "blob_size" => {
                if let Ok(n) = value.parse() {
                    if n > 0 {
                        self.blob_size = n;
                    }
                }
            }
            "dir_mode" => {
                if let Ok(mode) = u32::from_str_radix(value, 8) {
                    self.dir_mode = mode;
                }
            }
            "file_mode" => {
                if let Ok(mode) = u32::from_str_radix(value, 8) {
                    self.file_mode = mode;
                }
            }
            _ => {}
        }
    }

    /// Directory holding this database's shards and index.
    pub fn db_dir(&self) -> PathBuf {
        self.dir.join(&self.dbname)
    }

    /// Path of this database's index file.
    pub fn index_path(&self) -> PathBuf {
        self.db_dir().join(INDEX_FILE)
    }
}

/// Database names are plain alphanumeric tokens.
pub fn is_valid_dbname(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric())
}

fn is_valid_value(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '.' | ':' | '-'))
}
