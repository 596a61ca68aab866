//! File-backed session store
//!
//! Sessions live in a single CSV file:
//!
//! ```text
//! identity,token,expires_at,created_at
//! whatsapp:+15550001111,eyJhbGci...,1717171717,2024-05-24T16:08:37.123456+00:00
//! ```
//!
//! The file has no native upsert, so every operation reads the whole record
//! set and rewrites it under one lock. Rewrites go through a sibling temp file
//! and a rename.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::fs::{self, File};
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::core::GatewayResult;

use super::record::{redact_token, SessionRecord};
use super::store::SessionStore;

/// Column names of the session file
const HEADER: [&str; 4] = ["identity", "token", "expires_at", "created_at"];

/// CSV session store
#[derive(Debug)]
pub struct CsvSessionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CsvSessionStore {
    /// Open (or create) a session file at `path`
    ///
    /// A file that cannot be created is logged and retried implicitly by the
    /// next `save`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let store = Self {
            path: path.into(),
            lock: Mutex::new(()),
        };

        if let Err(e) = store.ensure_file() {
            tracing::warn!(
                "Could not initialise session file {}: {}",
                store.path.display(),
                e
            );
        }

        store
    }

    /// Get the session file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file with its header row if it doesn't exist
    fn ensure_file(&self) -> GatewayResult<()> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        self.write_records(&[])
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Read every well-formed record; malformed rows are skipped
    fn read_records(&self) -> GatewayResult<Vec<SessionRecord>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(BufReader::new(file));

        let mut records = Vec::new();
        for (index, row) in reader.records().enumerate() {
            let row = match row {
                Ok(row) => row,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    tracing::warn!("Skipping unreadable session row {}: {}", index + 2, e);
                    continue;
                }
            };

            match parse_row(&row) {
                Some(record) => records.push(record),
                None => tracing::warn!("Skipping malformed session row {}", index + 2),
            }
        }

        Ok(records)
    }

    /// Replace the file contents with `records`
    fn write_records(&self, records: &[SessionRecord]) -> GatewayResult<()> {
        let tmp_path = self.tmp_path();

        let mut writer = csv::Writer::from_path(&tmp_path)?;
        writer.write_record(HEADER)?;
        for record in records {
            let expires_at = record.expires_at.to_string();
            let created_at = record.created_at.to_rfc3339();
            writer.write_record([
                record.identity.as_str(),
                record.token.as_str(),
                expires_at.as_str(),
                created_at.as_str(),
            ])?;
        }
        writer.flush()?;
        drop(writer);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn try_get(&self, identity: &str) -> GatewayResult<Option<SessionRecord>> {
        let records = self.read_records()?;
        let now = Utc::now().timestamp();

        let before = records.len();
        let kept: Vec<SessionRecord> = records
            .into_iter()
            .filter(|r| r.identity != identity || r.is_valid_at(now))
            .collect();

        if kept.len() != before {
            tracing::debug!("Session for {} expired, removing", identity);
            self.write_records(&kept)?;
        }

        Ok(kept.into_iter().find(|r| r.identity == identity))
    }

    fn try_save(&self, identity: &str, token: &str, expires_at: i64) -> GatewayResult<()> {
        let mut records = self.read_records()?;
        records.retain(|r| r.identity != identity);
        records.push(SessionRecord::new(identity, token, expires_at));
        self.write_records(&records)
    }

    fn try_remove(&self, identity: &str) -> GatewayResult<()> {
        let mut records = self.read_records()?;
        let before = records.len();
        records.retain(|r| r.identity != identity);

        if records.len() != before {
            self.write_records(&records)?;
        }
        Ok(())
    }
}

impl SessionStore for CsvSessionStore {
    fn get(&self, identity: &str) -> Option<SessionRecord> {
        if identity.is_empty() {
            return None;
        }

        let _guard = self.lock();
        match self.try_get(identity) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Session lookup for {} failed: {}", identity, e);
                None
            }
        }
    }

    fn save(&self, identity: &str, token: &str, expires_at: i64) -> bool {
        if identity.is_empty() {
            tracing::warn!("Refusing to save a session with an empty identity");
            return false;
        }

        let _guard = self.lock();
        match self.try_save(identity, token, expires_at) {
            Ok(()) => {
                tracing::debug!(
                    "Saved session for {} (token {}, expires {})",
                    identity,
                    redact_token(token),
                    expires_at
                );
                true
            }
            Err(e) => {
                tracing::error!("Failed to save session for {}: {}", identity, e);
                false
            }
        }
    }

    fn remove(&self, identity: &str) -> bool {
        let _guard = self.lock();
        match self.try_remove(identity) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to remove session for {}: {}", identity, e);
                false
            }
        }
    }
}

fn parse_row(row: &csv::StringRecord) -> Option<SessionRecord> {
    if row.len() < HEADER.len() {
        return None;
    }

    let identity = row.get(0)?;
    let token = row.get(1)?;
    if identity.is_empty() || token.is_empty() {
        return None;
    }

    Some(SessionRecord {
        identity: identity.to_string(),
        token: token.to_string(),
        expires_at: parse_expires_at(row.get(2)?)?,
        created_at: parse_created_at(row.get(3)?),
    })
}

/// Unix seconds; fractional values are floored
fn parse_expires_at(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<i64>() {
        return Some(secs);
    }
    let secs: f64 = raw.parse().ok()?;
    secs.is_finite().then(|| secs.floor() as i64)
}

/// RFC 3339, or a naive ISO-8601 timestamp taken as UTC
fn parse_created_at(raw: &str) -> DateTime<Utc> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return naive.and_utc();
    }
    DateTime::<Utc>::default()
}
