//! The single per-database index file.
//!
//! Every live key has one entry mapping it to its shard path and summary
//! metadata, so existence checks and listings never touch the records
//! themselves. Mutations rewrite the whole file under the durable-write
//! lock. There is no rename swap: a crash mid-write can corrupt the index,
//! which readers then treat as empty; records self-heal through `get` and
//! re-`set`.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use silo_types::IndexEntry;

use crate::config::Options;
use crate::error::StoreResult;
use crate::fsutil;

pub struct IndexStore {
    path: PathBuf,
    file_mode: u32,
    dir_mode: u32,
}

impl IndexStore {
    pub fn new(options: &Options) -> Self {
        Self {
            path: options.index_path(),
            file_mode: options.file_mode,
            dir_mode: options.dir_mode,
        }
    }

    /// All live entries. An absent or unparsable index reads as empty.
    pub fn load(&self) -> BTreeMap<String, IndexEntry> {
        let Ok(text) = fs::read_to_string(&self.path) else {
            return BTreeMap::new();
        };
        serde_json::from_str(&text).unwrap_or_default()
    }

    /// Merge one entry and rewrite the index.
    pub fn upsert(&self, entry: IndexEntry) -> StoreResult<()> {
        let mut map = self.load();
        map.insert(entry.key.clone(), entry);
        self.persist(&map)
    }

    /// Drop one entry; rewrites only when something was removed.
    pub fn remove(&self, key: &str) -> StoreResult<bool> {
        let mut map = self.load();
        let removed = map.remove(key).is_some();
        if removed {
            self.persist(&map)?;
        }
        Ok(removed)
    }

    /// Entries whose key matches `pattern` (all of them when it is empty),
    /// in ascending timestamp order.
    pub fn list(&self, pattern: &str) -> Vec<IndexEntry> {
        let mut entries: Vec<IndexEntry> = self
            .load()
            .into_values()
            .filter(|entry| pattern.is_empty() || silo_match::wildcard_match(&entry.key, pattern))
            .collect();
        entries.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.key.cmp(&b.key))
        });
        entries
    }

    fn persist(&self, map: &BTreeMap<String, IndexEntry>) -> StoreResult<()> {
        let mut text = serde_json::to_string_pretty(map).map_err(io::Error::other)?;
        text.push('\n');
        fsutil::write_durable(&self.path, text.as_bytes(), self.file_mode, self.dir_mode)?;
        Ok(())
    }
}
