//! Object-storage layout for load-balancer access logs
//!
//! Logs are delivered under a key prefix derived from the account, region,
//! load-balancer name and a time partition. Retrieval itself is a
//! collaborator behind [`ObjectSource`]; this module only knows how keys are
//! laid out.

use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

static TIME_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<year>\d{4})(?P<month>\d{2})(?P<day>\d{2})(?:T(?P<time>\d+))?")
        .expect("valid time prefix regex")
});

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("time prefix '{0}' should be formatted like: 20150121T01...")]
    InvalidTimePrefix(String),

    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// A validated `YYYYMMDD[Thh...]` time partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimePrefix {
    raw: String,
    year: String,
    month: String,
    day: String,
}

impl TimePrefix {
    pub fn parse(raw: &str) -> Result<Self, StorageError> {
        let caps = TIME_PREFIX_RE
            .captures(raw)
            .ok_or_else(|| StorageError::InvalidTimePrefix(raw.to_string()))?;

        Ok(Self {
            raw: raw.to_string(),
            year: caps["year"].to_string(),
            month: caps["month"].to_string(),
            day: caps["day"].to_string(),
        })
    }

    /// `YYYY/MM/DD`
    pub fn date_path(&self) -> String {
        format!("{}/{}/{}", self.year, self.month, self.day)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Everything needed to locate one load balancer's logs for a time partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPrefix {
    pub account: String,
    pub region: String,
    pub elb: String,
    pub time: TimePrefix,
}

impl LogPrefix {
    pub fn new(
        account: impl Into<String>,
        region: impl Into<String>,
        elb: impl Into<String>,
        time: TimePrefix,
    ) -> Self {
        Self {
            account: account.into(),
            region: region.into(),
            elb: elb.into(),
            time,
        }
    }

    pub fn key_prefix(&self) -> String {
        format!(
            "AWSLogs/{account}/elasticloadbalancing/{region}/{date}/{account}_elasticloadbalancing_{region}_{elb}_{time}",
            account = self.account,
            region = self.region,
            date = self.time.date_path(),
            elb = self.elb,
            time = self.time.as_str(),
        )
    }
}

/// Local directory that downloaded objects for a partition land in
pub fn download_dir(output_dir: &Path, bucket: &str, time: &TimePrefix) -> PathBuf {
    output_dir.join(bucket).join(time.as_str())
}

/// Source of log objects addressed by key
pub trait ObjectSource {
    /// Keys starting with `prefix`, in lexical order
    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    fn fetch(&self, key: &str) -> Result<Vec<u8>, StorageError>;
}

/// An [`ObjectSource`] backed by a local mirror of a bucket
///
/// Keys are paths relative to the root, always joined with `/`.
#[derive(Debug, Clone)]
pub struct LocalObjectSource {
    root: PathBuf,
}

impl LocalObjectSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn walk(&self, dir: &Path, prefix: &str, keys: &mut Vec<String>) -> Result<(), StorageError> {
        let entries = fs::read_dir(dir).map_err(|source| io_error(dir, source))?;
        for entry in entries {
            let entry = entry.map_err(|source| io_error(dir, source))?;
            let path = entry.path();
            // Symlinked directories are not followed; linked files still count
            let file_type = entry.file_type().map_err(|source| io_error(&path, source))?;
            if file_type.is_dir() {
                self.walk(&path, prefix, keys)?;
            } else if path.is_dir() {
                continue;
            } else if let Some(key) = self.key_for(&path) {
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }
        Ok(())
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<&str> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<_>>()?;
        Some(parts.join("/"))
    }
}

impl ObjectSource for LocalObjectSource {
    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        self.walk(&self.root, prefix, &mut keys)?;
        keys.sort();
        Ok(keys)
    }

    fn fetch(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.root.join(key);
        fs::read(&path).map_err(|source| io_error(&path, source))
    }
}

fn io_error(path: &Path, source: io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}
