//! Ingestion of CAIDA AS-relationship snapshots, the standard public
//! source for the topology this crate propagates over.
//!
//! The serial format is line-oriented: `#` lines are comments,
//! `provider|customer|-1` records a transit relationship and
//! `peer|peer|0` a settlement-free one. Files are published monthly,
//! bz2-compressed.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use bzip2::read::BzDecoder;
use chrono::{Datelike, Utc};
use log::{debug, info};

use crate::as_graph::{ASGraph, RelationshipRecord};
use crate::shared::{CaidaError, Relationship};

const SERIAL_2_URL: &str = "https://publicdata.caida.org/datasets/as-relationships/serial-2/";

/// Parses relationship records from serial-format text. Comment and blank
/// lines are skipped; anything else that does not parse as a record fails
/// closed rather than being dropped.
pub fn read_relationships<R: Read>(reader: R) -> Result<Vec<RelationshipRecord>, CaidaError> {
    let reader = BufReader::new(reader);
    let mut records = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let record = parse_record(trimmed).ok_or_else(|| CaidaError::Parse {
            line: number + 1,
            content: line.clone(),
        })?;
        records.push(record);
    }
    info!("read {} relationship records", records.len());
    Ok(records)
}

/// Reads a relationship file, transparently decompressing `.bz2`.
pub fn read_relationships_file(path: &Path) -> Result<Vec<RelationshipRecord>, CaidaError> {
    let file = File::open(path)?;
    if path.extension().map(|ext| ext == "bz2").unwrap_or(false) {
        read_relationships(BzDecoder::new(file))
    } else {
        read_relationships(file)
    }
}

fn parse_record(line: &str) -> Option<RelationshipRecord> {
    let mut fields = line.split('|');
    let a = fields.next()?.trim().parse().ok()?;
    let b = fields.next()?.trim().parse().ok()?;
    let code = fields.next()?.trim().parse().ok()?;
    let relationship = Relationship::from_code(code)?;
    Some(RelationshipRecord::new(a, b, relationship))
}

/// Downloads and caches CAIDA serial-2 snapshots.
///
/// Snapshots are selected by (year, month); the default is the previous
/// calendar month, the latest one guaranteed to exist. Downloads are
/// decompressed once and cached as plain text.
#[derive(Debug, Clone)]
pub struct CaidaCollector {
    snapshot: Option<(i32, u32)>,
    cache_dir: PathBuf,
}

impl CaidaCollector {
    pub fn new() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bgpinfer");
        CaidaCollector {
            snapshot: None,
            cache_dir,
        }
    }

    pub fn with_cache_dir<P: Into<PathBuf>>(mut self, cache_dir: P) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    pub fn with_snapshot(mut self, year: i32, month: u32) -> Self {
        self.snapshot = Some((year, month));
        self
    }

    /// Ensures the snapshot is cached locally and returns its path.
    pub fn fetch(&self) -> Result<PathBuf, CaidaError> {
        fs::create_dir_all(&self.cache_dir)?;
        let (year, month) = self.snapshot_date();
        let cached_path = self
            .cache_dir
            .join(format!("{:04}{:02}01.as-rel2.txt", year, month));
        if cached_path.exists() {
            debug!("using cached CAIDA snapshot at {:?}", cached_path);
            return Ok(cached_path);
        }

        let url = format!("{}{:04}{:02}01.as-rel2.txt.bz2", SERIAL_2_URL, year, month);
        info!("downloading CAIDA AS relationships from {}", url);
        let response = reqwest::blocking::get(&url)?;
        if !response.status().is_success() {
            return Err(CaidaError::Download {
                url,
                status: response.status().as_u16(),
            });
        }
        let compressed = response.bytes()?.to_vec();

        let mut decoder = BzDecoder::new(compressed.as_slice());
        let mut text = Vec::new();
        io::copy(&mut decoder, &mut text)?;
        fs::write(&cached_path, text)?;
        info!("cached CAIDA snapshot at {:?}", cached_path);
        Ok(cached_path)
    }

    /// Fetches, parses, and builds the AS graph in one call.
    pub fn load(&self) -> Result<ASGraph, CaidaError> {
        let path = self.fetch()?;
        let records = read_relationships_file(&path)?;
        Ok(ASGraph::build(records)?)
    }

    fn snapshot_date(&self) -> (i32, u32) {
        if let Some(snapshot) = self.snapshot {
            return snapshot;
        }
        let today = Utc::now();
        match today.month() {
            1 => (today.year() - 1, 12),
            month => (today.year(), month - 1),
        }
    }
}

impl Default for CaidaCollector {
    fn default() -> Self {
        Self::new()
    }
}
