//! The `Silo` handle: the full operation set over one logical database.
//!
//! # Concurrency model
//!
//! Single-process, synchronous, blocking I/O. Cross-process safety relies
//! solely on the exclusive file lock taken for the duration of each record
//! and index write, which gives writer-writer exclusion per file. A record
//! write and its index update are NOT atomic together: a crash between them
//! leaves an orphaned record (never rediscovered) or a dangling index entry
//! (healed lazily by the next `get`). There are no read locks; a `get`
//! racing a `set` may observe a partial file, which surfaces as `NotFound`,
//! never a panic. Batch operations have no rollback.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use serde_json::Value as Json;
use tracing::debug;

use silo_codec::{self as codec, ReadFlags};
use silo_match::{search_field, search_value, wildcard_match};
use silo_types::{IndexEntry, Record, Value, ValueKind};

use crate::config::{is_valid_dbname, Options};
use crate::diag::{Diagnostic, DiagnosticLog};
use crate::error::{StoreError, StoreResult};
use crate::fsutil;
use crate::index::IndexStore;
use crate::shard;

/// Engine metadata returned by [`Silo::info`].
#[derive(Clone, Debug, Serialize)]
pub struct Info {
    pub name: &'static str,
    pub version: &'static str,
    pub options: Options,
}

/// A key's expiry after [`Silo::expire`] ran.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExpiryUpdate {
    pub key: String,
    /// Absolute unix seconds; 0 when the expiry was cleared.
    pub expiry: u64,
}

/// What to look for inside records during [`Silo::find`].
#[derive(Clone, Debug)]
pub enum MatchSpec {
    /// Match a scalar record by wildcard, or any descendant value of a
    /// structured one.
    Value(String),
    /// Match a field by name and scalar value inside structured records.
    Field { name: String, value: String },
}

/// Result of a [`Silo::find`].
#[derive(Clone, Debug, PartialEq)]
pub enum Found {
    One(Json),
    /// The fan-out form: every matching key with its found sub-structure.
    Many(BTreeMap<String, Json>),
}

/// A `get` outcome, shaped by the request's modifiers.
#[derive(Clone, Debug, PartialEq)]
pub enum Fetched {
    /// The decoded value alone.
    Value(Value),
    /// `.meta()` was requested: the stored record (encoding bits updated to
    /// what is still applied) alongside the decoded value.
    Record { record: Record, value: Value },
}

impl Fetched {
    pub fn into_value(self) -> Value {
        match self {
            Self::Value(value) => value,
            Self::Record { value, .. } => value,
        }
    }
}

/// Single-use request modifiers for one `get` or `set`.
///
/// The request is consumed by value by its terminal call, so a modifier can
/// never leak into a later operation.
#[must_use]
pub struct Request<'a> {
    silo: &'a Silo,
    meta: bool,
    blob: bool,
    encrypt: Option<String>,
    decrypt: Option<String>,
    expiry: u64,
    extra: BTreeMap<String, Json>,
}

impl Request<'_> {
    /// Have `get` return the full record alongside the value.
    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }

    /// Have `get` decode a binary payload back into raw bytes.
    pub fn blob(mut self) -> Self {
        self.blob = true;
        self
    }

    /// Obfuscate the payload written by `set` with `secret`.
    pub fn encrypt(mut self, secret: impl Into<String>) -> Self {
        self.encrypt = Some(secret.into());
        self
    }

    /// Deobfuscate the payload read by `get` with `secret`.
    pub fn decrypt(mut self, secret: impl Into<String>) -> Self {
        self.decrypt = Some(secret.into());
        self
    }

    /// Expire the key `seconds` from now (overrides the configured default
    /// TTL; 0 falls back to it).
    pub fn expiry(mut self, seconds: u64) -> Self {
        self.expiry = seconds;
        self
    }

    /// Merge caller metadata into the record written by `set`.
    pub fn extra(mut self, extra: BTreeMap<String, Json>) -> Self {
        self.extra.extend(extra);
        self
    }

    /// Store a value under `key`; returns the canonical key.
    pub fn set(self, key: &str, value: impl Into<Value>) -> StoreResult<String> {
        const CALLER: &str = "set";
        let silo = self.silo;
        let canonical = silo.sanitize(key);
        let mut extra = self.extra;
        let value = silo.resolve_file_ref(value.into(), &mut extra);

        let kind = codec::classify(&value);
        if kind == ValueKind::Rejected {
            silo.diag.record(CALLER, "value type is not storable");
            return Err(StoreError::InvalidInput("value type is not storable".into()));
        }
        if kind == ValueKind::Binary {
            let raw = raw_len(&value);
            if raw >= silo.options.blob_size {
                silo.diag.record(
                    CALLER,
                    format!("binary payload of {raw} bytes reaches the configured cap"),
                );
                return Err(StoreError::LimitExceeded(raw));
            }
        }

        let encoded = codec::encode(&value, self.encrypt.as_deref()).map_err(|err| {
            silo.diag.record(CALLER, err.to_string());
            StoreError::InvalidInput(err.to_string())
        })?;

        let mut record = Record::new(canonical, encoded.kind, encoded.size);
        record.value = encoded.payload;
        record.encoding = encoded.encoding;
        record.expiry = match (self.expiry, silo.options.key_expiry) {
            (0, 0) => 0,
            (0, ttl) => now_unix() + ttl,
            (seconds, _) => now_unix() + seconds,
        };
        record.extra = extra;

        silo.persist_record(&record).map_err(|err| {
            silo.diag.record(CALLER, err.to_string());
            err
        })?;
        debug!(key = %record.key, kind = %record.kind, size = record.size, "stored record");
        Ok(record.key)
    }

    /// Fetch the value (or full record) stored under `key`.
    pub fn get(self, key: &str) -> StoreResult<Fetched> {
        let silo = self.silo;
        let canonical = silo.sanitize(key);
        let mut record = silo.load_record("get", &canonical)?;

        let flags = ReadFlags {
            blob: self.blob,
            decrypt: self.decrypt,
        };
        let (value, encoding) = codec::decode(&record, &flags);
        debug!(key = %canonical, kind = %record.kind, "fetched record");

        if self.meta {
            record.encoding = encoding;
            Ok(Fetched::Record { record, value })
        } else {
            Ok(Fetched::Value(value))
        }
    }
}

/// An embedded flat-file key/value store over one database directory.
///
/// The handle is owned by the caller; collaborators receive a reference.
/// All state lives on disk except the diagnostics log.
pub struct Silo {
    options: Options,
    index: IndexStore,
    diag: DiagnosticLog,
}

impl Silo {
    /// Open a handle over the given options. Nothing is created on disk
    /// until the first write.
    pub fn new(options: Options) -> StoreResult<Self> {
        if !is_valid_dbname(&options.dbname) {
            return Err(StoreError::InvalidInput(format!(
                "invalid database name: {}",
                options.dbname
            )));
        }
        let index = IndexStore::new(&options);
        Ok(Self {
            options,
            index,
            diag: DiagnosticLog::default(),
        })
    }

    /// Begin a modified request; terminal `get`/`set` consumes it.
    pub fn request(&self) -> Request<'_> {
        Request {
            silo: self,
            meta: false,
            blob: false,
            encrypt: None,
            decrypt: None,
            expiry: 0,
            extra: BTreeMap::new(),
        }
    }

    /// Store a value under `key`; returns the canonical key.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> StoreResult<String> {
        self.request().set(key, value)
    }

    /// Fetch the value stored under `key`.
    pub fn get(&self, key: &str) -> StoreResult<Value> {
        self.request().get(key).map(Fetched::into_value)
    }

    /// Remove `key`'s record, index entry, and (when now empty) its shard
    /// directory. Repeated deletes fail with `NotFound`, never panic.
    pub fn delete(&self, key: &str) -> StoreResult<String> {
        const CALLER: &str = "delete";
        let canonical = self.sanitize(key);
        let path = self.record_path(&canonical);
        if !path.is_file() {
            let _ = self.index.remove(&canonical);
            self.diag.record(CALLER, format!("key {canonical} not found"));
            return Err(StoreError::NotFound(canonical));
        }
        fs::remove_file(&path).map_err(|err| {
            self.diag.record(CALLER, err.to_string());
            StoreError::Io(err)
        })?;
        self.index.remove(&canonical)?;
        shard::prune_shard(&path, &self.options)?;
        debug!(key = %canonical, "deleted record");
        Ok(canonical)
    }

    /// Per-key independent batch `get`; a failed key maps to `None`.
    pub fn mget(&self, keys: &[&str]) -> BTreeMap<String, Option<Value>> {
        keys.iter()
            .map(|key| ((*key).to_string(), self.get(key).ok()))
            .collect()
    }

    /// Per-key independent batch delete; returns the keys actually removed.
    pub fn mdelete(&self, keys: &[&str]) -> Vec<String> {
        keys.iter().filter_map(|key| self.delete(key).ok()).collect()
    }

    /// Delete every key in the database and return how many went. A count
    /// of zero covers both "nothing deleted" and "nothing to delete".
    pub fn flush(&self) -> usize {
        let keys = self.keys("").unwrap_or_default();
        keys.iter().filter(|key| self.delete(key).is_ok()).count()
    }

    /// Search one key, or every key when `key_pattern` is `"*"`.
    ///
    /// Binary and rejected records never match.
    pub fn find(&self, key_pattern: &str, spec: &MatchSpec) -> Option<Found> {
        if key_pattern == "*" {
            return Some(Found::Many(self.find_all(spec)));
        }
        self.find_data(key_pattern, spec).map(Found::One)
    }

    /// Fan the search out over every key; misses are omitted.
    pub fn find_all(&self, spec: &MatchSpec) -> BTreeMap<String, Json> {
        let mut results = BTreeMap::new();
        for key in self.keys("").unwrap_or_default() {
            if let Some(found) = self.find_data(&key, spec) {
                results.insert(key, found);
            }
        }
        results
    }

    /// All keys, or those matching the wildcard pattern, in ascending
    /// timestamp order. An empty result is `None`, not an empty list.
    pub fn keys(&self, pattern: &str) -> Option<Vec<String>> {
        let keys: Vec<String> = self
            .index
            .list(pattern)
            .into_iter()
            .map(|entry| entry.key)
            .collect();
        if keys.is_empty() {
            None
        } else {
            Some(keys)
        }
    }

    /// The index-entry form of [`Silo::keys`].
    pub fn entries(&self, pattern: &str) -> Option<Vec<IndexEntry>> {
        let entries = self.index.list(pattern);
        if entries.is_empty() {
            None
        } else {
            Some(entries)
        }
    }

    /// `true` when a record file exists for the key. Does not read it.
    pub fn exists(&self, key: &str) -> bool {
        self.record_path(&self.sanitize(key)).is_file()
    }

    /// Increment by 1. An absent key starts at 1.
    pub fn incr(&self, key: &str) -> StoreResult<i64> {
        self.step(key, 1, 1)
    }

    /// Increment by `amount`.
    pub fn incr_by(&self, key: &str, amount: i64) -> StoreResult<i64> {
        self.step(key, amount, 1)
    }

    /// Decrement by 1. An absent key starts at 0.
    pub fn decr(&self, key: &str) -> StoreResult<i64> {
        self.step(key, -1, 0)
    }

    /// Decrement by `amount`.
    pub fn decr_by(&self, key: &str, amount: i64) -> StoreResult<i64> {
        self.step(key, amount.saturating_neg(), 0)
    }

    /// Set (`seconds > 0`) or clear (`seconds <= 0`) a key's expiry. The
    /// record is rewritten wholesale with a fresh timestamp.
    pub fn expire(&self, key: &str, seconds: i64) -> StoreResult<ExpiryUpdate> {
        let canonical = self.sanitize(key);
        let mut record = self.load_record("expire", &canonical)?;
        record.expiry = if seconds > 0 {
            now_unix() + seconds as u64
        } else {
            0
        };
        record.touch();
        self.persist_record(&record)?;
        debug!(key = %canonical, expiry = record.expiry, "updated expiry");
        Ok(ExpiryUpdate {
            key: canonical,
            expiry: record.expiry,
        })
    }

    /// Append to an existing value of the same broad category: text joins
    /// with a single space, arrays concatenate, and an object operand nests
    /// as a single element. Everything else is an input error.
    pub fn append(&self, key: &str, value: impl Into<Value>) -> StoreResult<String> {
        const CALLER: &str = "append";
        let canonical = self.sanitize(key);
        let record = self.load_record(CALLER, &canonical)?;
        let (current, _) = codec::decode(&record, &ReadFlags::default());

        let merged = merge_values(current, value.into()).ok_or_else(|| {
            let status = "append operands are not the same broad category";
            self.diag.record(CALLER, status);
            StoreError::InvalidInput(status.into())
        })?;

        let encoded = codec::encode(&merged, None)
            .map_err(|err| StoreError::InvalidInput(err.to_string()))?;
        let mut next = Record::new(canonical, encoded.kind, encoded.size);
        next.value = encoded.payload;
        next.encoding = encoded.encoding;
        next.expiry = record.expiry;
        next.extra = record.extra;
        self.persist_record(&next)?;
        Ok(next.key)
    }

    /// A handle over another database under the same root. Pure
    /// configuration change; no data moves.
    pub fn select(&self, dbname: &str) -> StoreResult<Silo> {
        let mut options = self.options.clone();
        options.dbname = dbname.to_string();
        Silo::new(options)
    }

    /// A handle over another root directory. Pure configuration change.
    pub fn select_dir(&self, dir: impl Into<PathBuf>) -> StoreResult<Silo> {
        let mut options = self.options.clone();
        options.dir = dir.into();
        Silo::new(options)
    }

    /// Engine name, version, and an options snapshot.
    pub fn info(&self) -> Info {
        Info {
            name: "Silo",
            version: env!("CARGO_PKG_VERSION"),
            options: self.options.clone(),
        }
    }

    /// Everything logged on this handle so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diag.snapshot()
    }

    /// The options this handle was built with.
    pub fn options(&self) -> &Options {
        &self.options
    }

    fn sanitize(&self, key: &str) -> String {
        shard::sanitize(key, self.options.key_length)
    }

    fn record_path(&self, canonical: &str) -> PathBuf {
        shard::record_path(&self.options.db_dir(), canonical)
    }

    /// Read and validate a record. Damaged records (unreadable, unparsable,
    /// or missing their payload) are removed and reported as `NotFound`;
    /// expired records are removed and reported as `Expired`.
    fn load_record(&self, caller: &'static str, canonical: &str) -> StoreResult<Record> {
        let path = self.record_path(canonical);
        if !path.is_file() {
            let _ = self.index.remove(canonical);
            self.diag.record(caller, format!("key {canonical} not found"));
            return Err(StoreError::NotFound(canonical.to_string()));
        }

        let record = fs::read_to_string(&path)
            .ok()
            .and_then(|text| Record::from_json(&text).ok())
            .filter(Record::has_payload);
        let Some(record) = record else {
            self.remove_record_files(canonical, &path);
            self.diag
                .record(caller, format!("removed damaged record for {canonical}"));
            return Err(StoreError::NotFound(canonical.to_string()));
        };

        if record.is_expired(now_unix()) {
            self.remove_record_files(canonical, &path);
            self.diag.record(caller, format!("key {canonical} expired"));
            return Err(StoreError::Expired(canonical.to_string()));
        }
        Ok(record)
    }

    /// Best-effort removal of a record and its bookkeeping.
    fn remove_record_files(&self, canonical: &str, path: &Path) {
        let _ = fs::remove_file(path);
        let _ = self.index.remove(canonical);
        let _ = shard::prune_shard(path, &self.options);
    }

    fn persist_record(&self, record: &Record) -> StoreResult<()> {
        let path = self.record_path(&record.key);
        shard::ensure_shard(&path, &self.options)?;
        let text = record.to_json().map_err(io::Error::other)?;
        fsutil::write_durable(
            &path,
            text.as_bytes(),
            self.options.file_mode,
            self.options.dir_mode,
        )?;
        let rel = shard::index_rel_path(&self.options.db_dir(), &path);
        self.index.upsert(record.index_entry(rel))
    }

    fn resolve_file_ref(&self, value: Value, extra: &mut BTreeMap<String, Json>) -> Value {
        let Value::Str(text) = &value else {
            return value;
        };
        let Some(bytes) = fsutil::resolve_file_ref(text) else {
            return value;
        };
        extra.insert("source".into(), Json::String(text.clone()));
        match String::from_utf8(bytes) {
            Ok(content) if codec::is_printable_text(&content) => Value::Str(content),
            Ok(content) => Value::Bytes(content.into_bytes()),
            Err(err) => Value::Bytes(err.into_bytes()),
        }
    }

    fn find_data(&self, key: &str, spec: &MatchSpec) -> Option<Json> {
        let canonical = self.sanitize(key);
        let record = self.load_record("find", &canonical).ok()?;
        if !record.kind.is_searchable() {
            return None;
        }
        let (value, _) = codec::decode(&record, &ReadFlags::default());

        if record.kind.is_structured() {
            let tree = match &value {
                Value::Structured(tree) => tree.clone(),
                Value::Json(text) => serde_json::from_str(text).ok()?,
                _ => return None,
            };
            return match spec {
                MatchSpec::Value(pattern) => search_value(&tree, pattern),
                MatchSpec::Field { name, value } => search_field(&tree, name, value),
            };
        }

        let MatchSpec::Value(pattern) = spec else {
            return None;
        };
        match value {
            Value::Str(text) => wildcard_match(&text, pattern).then(|| Json::String(text)),
            Value::Int(n) => wildcard_match(&n.to_string(), pattern).then(|| Json::from(n)),
            _ => None,
        }
    }

    /// Shared `incr`/`decr` path. An integer-looking current value steps by
    /// `amount` with saturating arithmetic; anything else (including an
    /// absent key) resets the key to `reset` through the normal `set` path.
    fn step(&self, key: &str, amount: i64, reset: i64) -> StoreResult<i64> {
        if self.exists(key) {
            if let Ok(current) = self.get(key) {
                if let Some(n) = current.as_integer() {
                    let next = n.saturating_add(amount);
                    self.set(key, Value::Int(next))?;
                    return Ok(next);
                }
            }
        }
        self.set(key, Value::Int(reset))?;
        Ok(reset)
    }
}

impl std::fmt::Debug for Silo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Silo")
            .field("dir", &self.options.dir)
            .field("dbname", &self.options.dbname)
            .finish()
    }
}

fn now_unix() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

fn raw_len(value: &Value) -> u64 {
    match value {
        Value::Bytes(bytes) => bytes.len() as u64,
        Value::Str(s) | Value::Json(s) => s.len() as u64,
        _ => 0,
    }
}

/// Merge rules for `append`.
fn merge_values(current: Value, addition: Value) -> Option<Value> {
    match (current, addition) {
        (Value::Str(a) | Value::Json(a), Value::Str(b) | Value::Json(b)) => {
            Some(Value::Str(format!("{a} {b}")))
        }
        (Value::Structured(a), Value::Structured(b)) => {
            let mut items = nested_elements(a);
            items.extend(nested_elements(b));
            Some(Value::Structured(Json::Array(items)))
        }
        _ => None,
    }
}

fn nested_elements(tree: Json) -> Vec<Json> {
    match tree {
        Json::Array(items) => items,
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn open(dir: &TempDir) -> Silo {
        open_with(dir, Options::default())
    }

    fn open_with(dir: &TempDir, mut options: Options) -> Silo {
        options.dir = dir.path().to_path_buf();
        Silo::new(options).unwrap()
    }

    #[test]
    fn set_then_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        assert_eq!(silo.set("greeting", "hello world!").unwrap(), "greeting");
        assert_eq!(silo.get("greeting").unwrap(), Value::from("hello world!"));
    }

    #[test]
    fn get_missing_key_is_not_found() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        assert!(matches!(
            silo.get("nope").unwrap_err(),
            StoreError::NotFound(_)
        ));
        assert!(!silo.diagnostics().is_empty());
    }

    #[test]
    fn invalid_dbname_is_rejected() {
        let err = Silo::new(Options {
            dbname: "not/valid".into(),
            ..Options::default()
        })
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
    }

    #[test]
    fn rejected_value_is_invalid_input() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        assert!(matches!(
            silo.set("k", Value::Rejected).unwrap_err(),
            StoreError::InvalidInput(_)
        ));
        assert!(!silo.exists("k"));
    }

    #[test]
    fn expired_record_is_removed_on_get() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        silo.set("fleeting", "soon gone").unwrap();

        // Push the deadline into the past through the store's own write path.
        let mut record = silo.load_record("test", "fleeting").unwrap();
        record.expiry = 1;
        silo.persist_record(&record).unwrap();

        assert!(matches!(
            silo.get("fleeting").unwrap_err(),
            StoreError::Expired(_)
        ));
        assert!(!silo.exists("fleeting"));
        assert_eq!(silo.keys(""), None);
    }

    #[test]
    fn expiry_request_sets_absolute_deadline() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        silo.request().expiry(120).set("k", "v").unwrap();

        let Fetched::Record { record, .. } = silo.request().meta().get("k").unwrap() else {
            panic!("expected record");
        };
        assert!(record.expiry > now_unix());
    }

    #[test]
    fn default_ttl_applies_when_request_has_none() {
        let dir = TempDir::new().unwrap();
        let silo = open_with(
            &dir,
            Options {
                key_expiry: 300,
                ..Options::default()
            },
        );
        silo.set("k", "v").unwrap();
        let Fetched::Record { record, .. } = silo.request().meta().get("k").unwrap() else {
            panic!("expected record");
        };
        assert!(record.expiry >= now_unix() + 250);
    }

    #[test]
    fn expire_sets_and_clears() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        silo.set("k", "v").unwrap();

        let update = silo.expire("k", 60).unwrap();
        assert_eq!(update.key, "k");
        assert!(update.expiry > now_unix());

        let update = silo.expire("k", 0).unwrap();
        assert_eq!(update.expiry, 0);
        assert_eq!(silo.get("k").unwrap(), Value::from("v"));
    }

    #[test]
    fn incr_decr_chain() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        assert_eq!(silo.incr("c").unwrap(), 1);
        assert_eq!(silo.incr_by("c", 10).unwrap(), 11);
        assert_eq!(silo.decr("c").unwrap(), 10);
        assert_eq!(silo.decr_by("c", 10).unwrap(), 0);
    }

    #[test]
    fn incr_on_non_integer_resets() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        silo.set("c", "not a number").unwrap();
        assert_eq!(silo.incr("c").unwrap(), 1);
        assert_eq!(silo.get("c").unwrap(), Value::Int(1));
    }

    #[test]
    fn incr_saturates_at_integer_bounds() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        silo.set("c", Value::Int(i64::MAX)).unwrap();
        assert_eq!(silo.incr("c").unwrap(), i64::MAX);
    }

    #[test]
    fn integer_like_strings_participate() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        silo.set("c", "41").unwrap();
        assert_eq!(silo.incr("c").unwrap(), 42);
    }

    #[test]
    fn oversized_blob_is_refused() {
        let dir = TempDir::new().unwrap();
        let silo = open_with(
            &dir,
            Options {
                blob_size: 8,
                ..Options::default()
            },
        );
        let err = silo.set("blob", vec![0u8; 8]).unwrap_err();
        assert!(matches!(err, StoreError::LimitExceeded(8)));
        assert_eq!(silo.keys(""), None);

        // One byte under the cap is fine.
        silo.set("blob", vec![0u8; 7]).unwrap();
        assert!(silo.exists("blob"));
    }

    #[test]
    fn encrypt_then_decrypt_roundtrip() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        silo.request().encrypt("s3cret").set("k", "plain").unwrap();

        let fetched = silo.request().decrypt("s3cret").get("k").unwrap();
        assert_eq!(fetched.into_value(), Value::from("plain"));

        // Without the decrypt flag the payload stays sealed.
        let sealed = silo.get("k").unwrap();
        assert_ne!(sealed, Value::from("plain"));
        let Value::Str(text) = sealed else {
            panic!("expected sealed text");
        };
        assert!(!text.is_empty());
    }

    #[test]
    fn wrong_secret_leaves_payload_sealed() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        silo.request().encrypt("right").set("k", "plain").unwrap();
        let fetched = silo.request().decrypt("right").get("k").unwrap();
        assert_eq!(fetched.into_value(), Value::from("plain"));
        let sealed = silo.get("k").unwrap();
        let with_wrong = silo.request().decrypt("wrong-secret-x").get("k").unwrap();
        // Either the garbage failed the text check and the ciphertext is
        // returned, or it cannot equal the plain text.
        assert_ne!(with_wrong.into_value(), Value::from("plain"));
        assert!(matches!(sealed, Value::Str(_)));
    }

    #[test]
    fn blob_request_recovers_bytes() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        let bytes = vec![0u8, 1, 255, 7, 42];
        silo.set("blob", bytes.clone()).unwrap();

        let fetched = silo.request().blob().get("blob").unwrap();
        assert_eq!(fetched.into_value(), Value::Bytes(bytes));

        // Without the blob flag the encoded text comes back.
        assert!(matches!(silo.get("blob").unwrap(), Value::Str(_)));
    }

    #[test]
    fn meta_request_returns_record() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        silo.set("k", "v").unwrap();
        let Fetched::Record { record, value } = silo.request().meta().get("k").unwrap() else {
            panic!("expected record");
        };
        assert_eq!(record.key, "k");
        assert_eq!(record.kind, ValueKind::String);
        assert_eq!(value, Value::from("v"));
    }

    #[test]
    fn extra_meta_is_persisted() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        let extra = BTreeMap::from([("mime".to_string(), json!("text/plain"))]);
        silo.request().extra(extra).set("k", "v").unwrap();
        let Fetched::Record { record, .. } = silo.request().meta().get("k").unwrap() else {
            panic!("expected record");
        };
        assert_eq!(record.extra["mime"], json!("text/plain"));
    }

    #[test]
    fn file_reference_is_resolved() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        let source = dir.path().join("note.txt");
        fs::write(&source, "content from disk").unwrap();

        silo.set("note", format!("file://{}", source.display())).unwrap();
        let Fetched::Record { record, value } = silo.request().meta().get("note").unwrap() else {
            panic!("expected record");
        };
        assert_eq!(value, Value::from("content from disk"));
        assert_eq!(
            record.extra["source"],
            json!(format!("file://{}", source.display()))
        );
    }

    #[test]
    fn delete_removes_record_and_index_entry() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        silo.set("k", "v").unwrap();
        assert_eq!(silo.delete("k").unwrap(), "k");
        assert!(!silo.exists("k"));
        assert_eq!(silo.keys(""), None);

        // Idempotent failure: both repeats report NotFound.
        assert!(matches!(silo.delete("k").unwrap_err(), StoreError::NotFound(_)));
        assert!(matches!(silo.delete("k").unwrap_err(), StoreError::NotFound(_)));
    }

    #[test]
    fn delete_prunes_empty_shard() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        silo.set("k", "v").unwrap();
        let shard_dir = silo.record_path("k").parent().unwrap().to_path_buf();
        assert!(shard_dir.join("index.json").is_file());

        silo.delete("k").unwrap();
        assert!(!shard_dir.exists());
    }

    #[test]
    fn damaged_record_self_heals() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        silo.set("k", "v").unwrap();
        fs::write(silo.record_path("k"), "truncated garbag").unwrap();

        assert!(matches!(silo.get("k").unwrap_err(), StoreError::NotFound(_)));
        assert!(!silo.exists("k"));
        assert_eq!(silo.keys(""), None);
    }

    #[test]
    fn unparsable_index_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        silo.set("k", "v").unwrap();
        fs::write(silo.options.index_path(), "{ not json").unwrap();

        assert_eq!(silo.keys(""), None);
        // The store keeps working; the next write rebuilds the index.
        silo.set("k2", "v2").unwrap();
        assert_eq!(silo.keys("").unwrap(), ["k2"]);
    }

    #[test]
    fn keys_filter_and_order() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        silo.set("user:1", "a").unwrap();
        silo.set("user:2", "b").unwrap();
        silo.set("job:1", "c").unwrap();

        let keys = silo.keys("user:*").unwrap();
        assert_eq!(keys, ["user:1", "user:2"]);
        assert_eq!(silo.keys("none*"), None);
        assert_eq!(silo.keys("").unwrap().len(), 3);
    }

    #[test]
    fn mget_is_per_key_independent() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        silo.set("a", "1").unwrap();
        silo.set("b", "2").unwrap();

        let got = silo.mget(&["a", "missing", "b"]);
        assert_eq!(got["a"], Some(Value::from("1")));
        assert_eq!(got["missing"], None);
        assert_eq!(got["b"], Some(Value::from("2")));
    }

    #[test]
    fn mdelete_reports_deleted_keys() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        silo.set("a", "1").unwrap();
        silo.set("b", "2").unwrap();
        assert_eq!(silo.mdelete(&["a", "missing", "b"]), ["a", "b"]);
    }

    #[test]
    fn flush_counts_deletions() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        silo.set("a", "1").unwrap();
        silo.set("b", "2").unwrap();
        assert_eq!(silo.flush(), 2);
        assert_eq!(silo.flush(), 0);
        assert_eq!(silo.keys(""), None);
    }

    #[test]
    fn find_scalar_by_wildcard() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        silo.set("greeting", "hello world").unwrap();
        let found = silo.find("greeting", &MatchSpec::Value("hello*".into()));
        assert_eq!(found, Some(Found::One(json!("hello world"))));
        assert_eq!(silo.find("greeting", &MatchSpec::Value("bye*".into())), None);
    }

    #[test]
    fn find_field_across_records() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        silo.set(
            "alpha",
            Value::Structured(json!({"status": "valid", "n": 1})),
        )
        .unwrap();
        silo.set(
            "beta",
            Value::Structured(json!({"nested": {"status": "value-2"}})),
        )
        .unwrap();
        silo.set("gamma", Value::Structured(json!({"status": "other"})))
            .unwrap();
        silo.set("scalar", "val").unwrap();

        let spec = MatchSpec::Field {
            name: "status".into(),
            value: "val*".into(),
        };
        let Some(Found::Many(found)) = silo.find("*", &spec) else {
            panic!("expected fan-out");
        };
        assert_eq!(found.len(), 2);
        assert_eq!(found["alpha"], json!({"status": "valid", "n": 1}));
        assert_eq!(found["beta"], json!({"status": "value-2"}));
    }

    #[test]
    fn find_descendant_value_in_structure() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        silo.set(
            "doc",
            Value::Structured(json!({"outer": {"inner": "needle"}})),
        )
        .unwrap();
        let found = silo.find("doc", &MatchSpec::Value("needle".into()));
        assert_eq!(found, Some(Found::One(json!({"inner": "needle"}))));
    }

    #[test]
    fn binary_records_are_unsearchable() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        silo.set("blob", vec![0u8, 1, 2]).unwrap();
        assert_eq!(silo.find("blob", &MatchSpec::Value("*".into())), None);
    }

    #[test]
    fn append_joins_strings_with_a_space() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        silo.set("k", "hello").unwrap();
        silo.append("k", "more").unwrap();
        assert_eq!(silo.get("k").unwrap(), Value::from("hello more"));
    }

    #[test]
    fn append_concatenates_arrays() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        silo.set("seq", Value::Structured(json!([1, 2]))).unwrap();
        silo.append("seq", Value::Structured(json!([3]))).unwrap();
        assert_eq!(
            silo.get("seq").unwrap(),
            Value::Structured(json!([1, 2, 3]))
        );
    }

    #[test]
    fn append_nests_object_operands() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        silo.set("seq", Value::Structured(json!([1, 2]))).unwrap();
        silo.append("seq", Value::Structured(json!({"a": 3}))).unwrap();
        assert_eq!(
            silo.get("seq").unwrap(),
            Value::Structured(json!([1, 2, {"a": 3}]))
        );
    }

    #[test]
    fn append_across_categories_is_invalid() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        silo.set("k", "text").unwrap();
        assert!(matches!(
            silo.append("k", Value::Structured(json!([1]))).unwrap_err(),
            StoreError::InvalidInput(_)
        ));
        assert!(matches!(
            silo.append("missing", "x").unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[test]
    fn append_preserves_expiry_and_extra() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        let extra = BTreeMap::from([("origin".to_string(), json!("test"))]);
        silo.request().expiry(600).extra(extra).set("k", "a").unwrap();
        silo.append("k", "b").unwrap();

        let Fetched::Record { record, .. } = silo.request().meta().get("k").unwrap() else {
            panic!("expected record");
        };
        assert!(record.expiry > now_unix());
        assert_eq!(record.extra["origin"], json!("test"));
    }

    #[test]
    fn select_switches_database() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        silo.set("k", "main").unwrap();

        let other = silo.select("other").unwrap();
        assert!(!other.exists("k"));
        other.set("k", "other").unwrap();

        assert_eq!(silo.get("k").unwrap(), Value::from("main"));
        assert_eq!(other.get("k").unwrap(), Value::from("other"));
        assert!(silo.select("bad name").is_err());
    }

    #[test]
    fn malformed_keys_map_to_stable_surrogates() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        let canonical = silo.set("white space", "v").unwrap();
        assert_ne!(canonical, "white space");
        assert_eq!(silo.get("white space").unwrap(), Value::from("v"));
        assert!(silo.exists("white space"));
    }

    #[test]
    fn structured_roundtrip() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        let tree = json!({"name": "silo", "tags": ["kv", "cache"], "n": 3});
        silo.set("doc", Value::Structured(tree.clone())).unwrap();
        assert_eq!(silo.get("doc").unwrap(), Value::Structured(tree));
    }

    #[test]
    fn json_string_keeps_its_kind() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        silo.set("doc", r#"{"a": 1}"#).unwrap();
        let Fetched::Record { record, value } = silo.request().meta().get("doc").unwrap() else {
            panic!("expected record");
        };
        assert_eq!(record.kind, ValueKind::Json);
        assert_eq!(value, Value::Json(r#"{"a": 1}"#.into()));
    }

    #[test]
    fn info_reports_engine_and_options() {
        let dir = TempDir::new().unwrap();
        let silo = open(&dir);
        let info = silo.info();
        assert_eq!(info.name, "Silo");
        assert!(!info.version.is_empty());
        assert_eq!(info.options.dbname, "db0");
    }
}
