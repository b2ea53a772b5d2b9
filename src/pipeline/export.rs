use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use anyhow::{Context, Result};

/// One flattened output record: nested per-band dictionaries collapsed to a
/// single level, keyed by band/attribute name.
#[derive(Debug, Clone)]
pub struct FlatRecord {
    pub id: String,
    pub values: BTreeMap<String, Option<f64>>,
}

/// Output format selector, mirroring what the remote platform accepts.
#[derive(Debug, Clone)]
pub enum ExportFormat {
    /// Delimited text table.
    Table { delimiter: u8 },
    /// Tiled raster export options.
    TiledRaster {
        shard_size: u32,
        file_dimensions: (u32, u32),
        cloud_optimized: bool,
        max_pixels: u64,
    },
}

impl ExportFormat {
    pub fn csv() -> Self {
        ExportFormat::Table { delimiter: b',' }
    }
}

/// Destination addressing: a folder plus a human-readable description used
/// as the file stem.
#[derive(Debug, Clone)]
pub struct Destination {
    pub folder: String,
    pub description: String,
}

impl Destination {
    pub fn new(folder: impl Into<String>, description: impl Into<String>) -> Self {
        Destination {
            folder: folder.into(),
            description: description.into(),
        }
    }

    /// Same folder, batch-suffixed description (1-based, as the platform
    /// names batch exports).
    pub fn for_batch(&self, index: usize) -> Destination {
        Destination {
            folder: self.folder.clone(),
            description: format!("{}_batch_{}", self.description, index + 1),
        }
    }
}

/// Typed export sink. The pipeline never looks past this seam.
pub trait ExportSink: Sync {
    fn export(
        &self,
        records: &[FlatRecord],
        format: &ExportFormat,
        destination: &Destination,
    ) -> Result<()>;
}

/// Writes tables as delimited text under `<root>/<folder>/<description>.csv`.
/// Columns are the sorted union of record keys; missing values are empty
/// fields.
pub struct CsvFolderSink {
    root: PathBuf,
}

impl CsvFolderSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        CsvFolderSink { root: root.into() }
    }
}

impl ExportSink for CsvFolderSink {
    fn export(
        &self,
        records: &[FlatRecord],
        format: &ExportFormat,
        destination: &Destination,
    ) -> Result<()> {
        let ExportFormat::Table { delimiter } = format else {
            anyhow::bail!("CsvFolderSink only writes tables");
        };

        let dir = self.root.join(&destination.folder);
        std::fs::create_dir_all(&dir)
            .context(format!("Failed to create export directory {:?}", dir))?;
        let path = dir.join(format!("{}.csv", destination.description));

        let columns: BTreeSet<&str> = records
            .iter()
            .flat_map(|r| r.values.keys().map(|k| k.as_str()))
            .collect();

        let mut writer = csv::WriterBuilder::new()
            .delimiter(*delimiter)
            .from_path(&path)
            .context(format!("Failed to open export file {:?}", path))?;

        let mut header = vec!["id"];
        header.extend(columns.iter().copied());
        writer.write_record(&header)?;

        for record in records {
            let mut row = vec![record.id.clone()];
            for column in &columns {
                let cell = record
                    .values
                    .get(*column)
                    .copied()
                    .flatten()
                    .map(|v| v.to_string())
                    .unwrap_or_default();
                row.push(cell);
            }
            writer.write_record(&row)?;
        }
        writer
            .flush()
            .context(format!("Failed to flush export file {:?}", path))?;

        println!("Exported {} record(s) to {:?}", records.len(), path);
        Ok(())
    }
}
