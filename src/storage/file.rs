//! Append-only file router

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{StatsStorageRouter, StorageRecord};
use crate::error::{TelemetryError, TelemetryResult};
use crate::report::{StatsInitializationReport, StatsReport, StorageMetaData};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportEncoding {
    /// One JSON document per line
    Json,
    /// Consecutive bincode records
    Bincode,
}

impl std::str::FromStr for ReportEncoding {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ReportEncoding::Json),
            "bincode" => Ok(ReportEncoding::Bincode),
            other => Err(TelemetryError::InvalidInput(format!("unknown encoding '{}'", other))),
        }
    }
}

/// Appends every record to a single file, flushing after each one
pub struct FileStatsStorage {
    path: PathBuf,
    encoding: ReportEncoding,
    writer: Mutex<BufWriter<File>>,
}

impl FileStatsStorage {
    pub fn open(path: impl AsRef<Path>, encoding: ReportEncoding) -> TelemetryResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        tracing::debug!("Writing {:?} records to {:?}", encoding, path);

        Ok(Self {
            path,
            encoding,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn encode(&self, writer: &mut BufWriter<File>, record: &StorageRecord) -> TelemetryResult<()> {
        match self.encoding {
            ReportEncoding::Json => {
                serde_json::to_writer(&mut *writer, record)?;
                writer.write_all(b"\n")?;
            }
            ReportEncoding::Bincode => {
                bincode::serialize_into(&mut *writer, record)?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    fn write(&self, operation: &str, record: &StorageRecord) -> TelemetryResult<()> {
        let mut writer = self.writer.lock();
        self.encode(&mut writer, record)
            .map_err(|e| TelemetryError::router_failure(operation, &e.to_string()))
    }
}

impl StatsStorageRouter for FileStatsStorage {
    fn put_storage_metadata(&self, meta: StorageMetaData) -> TelemetryResult<()> {
        self.write("put_storage_metadata", &StorageRecord::MetaData(meta))
    }

    fn put_static_info(&self, report: StatsInitializationReport) -> TelemetryResult<()> {
        self.write("put_static_info", &StorageRecord::StaticInfo(report))
    }

    fn put_update(&self, report: StatsReport) -> TelemetryResult<()> {
        self.write("put_update", &StorageRecord::Update(report))
    }
}

/// Reads back every record written by a [`FileStatsStorage`]
pub fn read_records(path: impl AsRef<Path>, encoding: ReportEncoding) -> TelemetryResult<Vec<StorageRecord>> {
    let mut reader = BufReader::new(File::open(path.as_ref())?);
    let mut records = Vec::new();

    match encoding {
        ReportEncoding::Json => {
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                records.push(serde_json::from_str(&line)?);
            }
        }
        ReportEncoding::Bincode => loop {
            if reader.fill_buf()?.is_empty() {
                break;
            }
            records.push(bincode::deserialize_from(&mut reader)?);
        },
    }

    Ok(records)
}
