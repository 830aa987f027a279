//! Key sanitation and digest-based path sharding.
//!
//! A canonical key maps to its record location through a BLAKE3 digest: the
//! first two hex characters pick one of up to 256 shard directories, the
//! rest become the file name. Shard directories are created lazily on first
//! write, each carrying a marker file recording its shard id, and are pruned
//! again once their last record is deleted.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::json;

use silo_codec::base;

use crate::config::{Options, INDEX_FILE};
use crate::fsutil;

/// Record file extension.
const RECORD_EXT: &str = "json";

/// Length of the surrogate substituted for keys that needed sanitizing.
const SURROGATE_LEN: usize = 12;

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | ':' | '-')
}

/// Canonicalize a raw key.
///
/// Keys already inside the allowed charset pass through (truncated to
/// `max_length`). Anything else is replaced by a surrogate: the stripped
/// form extended with a digest fingerprint of the original key, cut to
/// [`SURROGATE_LEN`]. The surrogate depends only on the key, so the same
/// input always lands on the same record.
pub fn sanitize(raw: &str, max_length: usize) -> String {
    let stripped: String = raw.chars().filter(|&c| is_key_char(c)).collect();
    let mut key = if stripped == raw {
        raw.to_string()
    } else {
        let digest = blake3::hash(raw.as_bytes());
        let mut surrogate = stripped;
        surrogate.push_str(&base::fingerprint(digest.as_bytes()));
        surrogate.truncate(SURROGATE_LEN);
        surrogate
    };
    key.truncate(max_length);
    key
}

/// Record location for a canonical key: `db_dir/<2-hex>/<62-hex>.json`.
/// Pure; touches no filesystem state.
pub fn record_path(db_dir: &Path, canonical: &str) -> PathBuf {
    let digest = hex::encode(blake3::hash(canonical.as_bytes()).as_bytes());
    let (prefix, rest) = digest.split_at(2);
    db_dir.join(prefix).join(format!("{rest}.{RECORD_EXT}"))
}

/// A record path relative to the database directory with the extension
/// stripped; the form stored in the index.
pub fn index_rel_path(db_dir: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(db_dir).unwrap_or(path).with_extension("");
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Create the shard directory for `record_path` if needed, dropping a
/// marker file that records the shard id.
pub fn ensure_shard(record_path: &Path, options: &Options) -> io::Result<()> {
    let Some(dir) = record_path.parent() else {
        return Ok(());
    };
    let marker = dir.join(INDEX_FILE);
    if dir.is_dir() && marker.is_file() {
        return Ok(());
    }
    fsutil::ensure_dir(dir, options.dir_mode)?;
    let shard = dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut text = json!({ "shard": shard }).to_string();
    text.push('\n');
    fsutil::write_durable(&marker, text.as_bytes(), options.file_mode, options.dir_mode)
}

/// After a delete: remove the shard directory once it holds nothing but its
/// marker, and recreate the marker if records remain without one.
pub fn prune_shard(record_path: &Path, options: &Options) -> io::Result<()> {
    let Some(dir) = record_path.parent() else {
        return Ok(());
    };
    if !dir.is_dir() {
        return Ok(());
    }
    let mut records = 0usize;
    let mut marker = false;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name() == INDEX_FILE {
            marker = true;
        } else {
            records += 1;
        }
    }
    if records == 0 {
        if marker {
            fs::remove_file(dir.join(INDEX_FILE))?;
        }
        fs::remove_dir(dir)
    } else if !marker {
        ensure_shard(record_path, options)
    } else {
        Ok(())
    }
}
