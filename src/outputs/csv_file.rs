//! Per-edition CSV store.
//!
//! ```text
//! data_dir/
//! ├── fifa15.csv
//! ├── fifa16.csv
//! └── ...
//! ```
//!
//! [`CsvEditionWriter::initialize`] truncates the file down to the header
//! row. [`CsvEditionWriter::append_batch`] appends one listing page's rows
//! and syncs them to disk before returning, so an interrupted crawl loses
//! at most the page in flight.

use crate::error::StorageError;
use crate::models::{EditionTarget, PlayerRecord};
use crate::schema::Schema;
use csv::WriterBuilder;
use std::path::Path;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

fn unavailable(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Unavailable {
        path: path.to_path_buf(),
        source,
    }
}

/// Writes edition files as delimited text, one row per record.
#[derive(Debug, Clone, Copy)]
pub struct CsvEditionWriter {
    delimiter: u8,
}

impl Default for CsvEditionWriter {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvEditionWriter {
    /// Comma-delimited writer.
    pub fn new() -> Self {
        Self::default()
    }

    fn encode<'a, R>(&self, rows: impl IntoIterator<Item = R>) -> Result<Vec<u8>, StorageError>
    where
        R: IntoIterator<Item = &'a String>,
    {
        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(Vec::new());
        for row in rows {
            writer.write_record(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| StorageError::Csv(e.into_error().into()))
    }

    /// Create or truncate the edition file and write the header row.
    ///
    /// Missing parent directories are created. Any earlier content of the
    /// file is discarded.
    ///
    /// # Arguments
    ///
    /// * `target` - Edition whose `output_path` is written
    /// * `schema` - Field names forming the header row
    ///
    /// # Example
    ///
    /// ```ignore
    /// let target = EditionTarget::new("19", "fifa", Path::new("./data"));
    /// CsvEditionWriter::new().initialize(&target, &schema).await?;
    /// // ./data/fifa19.csv now holds only the header row
    /// ```
    ///
    /// # Errors
    ///
    /// [`StorageError::Unavailable`] if the directory or file cannot be created.
    #[instrument(level = "info", skip_all, fields(edition = %target, path = %target.output_path.display()))]
    pub async fn initialize(
        &self,
        target: &EditionTarget,
        schema: &Schema,
    ) -> Result<(), StorageError> {
        let path = &target.output_path;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await.map_err(unavailable(dir))?;
        }

        let header = self.encode([schema.field_names()])?;
        fs::write(path, header).await.map_err(unavailable(path))?;
        info!(columns = schema.len(), "Initialized edition file");
        Ok(())
    }

    /// Append `records` in order and sync them to disk.
    ///
    /// Prior content is neither read nor validated. The file must already
    /// exist, see [`CsvEditionWriter::initialize`]. An empty batch leaves
    /// the file untouched.
    ///
    /// # Arguments
    ///
    /// * `target` - Edition whose `output_path` is appended to
    /// * `records` - Rows in listing order
    ///
    /// # Errors
    ///
    /// [`StorageError::Unavailable`] if the file cannot be opened or written,
    /// or [`StorageError::Csv`] if a row cannot be encoded.
    #[instrument(level = "debug", skip_all, fields(edition = %target, rows = records.len()))]
    pub async fn append_batch(
        &self,
        target: &EditionTarget,
        records: &[PlayerRecord],
    ) -> Result<(), StorageError> {
        if records.is_empty() {
            return Ok(());
        }
        let path = &target.output_path;
        let bytes = self.encode(records.iter().map(PlayerRecord::fields))?;

        let mut file = OpenOptions::new()
            .append(true)
            .open(path)
            .await
            .map_err(unavailable(path))?;
        file.write_all(&bytes).await.map_err(unavailable(path))?;
        file.flush().await.map_err(unavailable(path))?;
        file.sync_data().await.map_err(unavailable(path))?;

        debug!(bytes = bytes.len(), "Appended batch");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IDENTITY_FIELD_COUNT;

    fn schema() -> Schema {
        Schema::parse("name\nclub\nnation\nage\nposition\nrating\npotential\npace\nshooting\n")
            .unwrap()
    }

    fn record(name: &str, club: &str) -> PlayerRecord {
        let identity: [String; IDENTITY_FIELD_COUNT] =
            [name, club, "Spain", "30", "CM", "85", "85"].map(String::from);
        PlayerRecord::new(identity, vec!["70".into(), "-".into()])
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect()
    }

    #[tokio::test]
    async fn test_initialize_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let target = EditionTarget::new("19", "fifa", &dir.path().join("data"));
        CsvEditionWriter::new().initialize(&target, &schema()).await.unwrap();

        let rows = read_rows(&target.output_path);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], schema().field_names());
    }

    #[tokio::test]
    async fn test_initialize_overwrites_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let target = EditionTarget::new("18", "fifa", dir.path());
        std::fs::write(&target.output_path, "stale,row\nmore,junk\n").unwrap();

        let writer = CsvEditionWriter::new();
        writer.initialize(&target, &schema()).await.unwrap();
        writer.append_batch(&target, &[record("A", "B")]).await.unwrap();
        writer.initialize(&target, &schema()).await.unwrap();

        let rows = read_rows(&target.output_path);
        assert_eq!(rows, vec![schema().field_names().to_vec()]);
    }

    #[tokio::test]
    async fn test_append_preserves_order_and_quotes() {
        let dir = tempfile::tempdir().unwrap();
        let target = EditionTarget::new("17", "fifa", dir.path());
        let writer = CsvEditionWriter::new();
        writer.initialize(&target, &schema()).await.unwrap();
        writer
            .append_batch(&target, &[record("Iniesta", "Vissel Kobe"), record("Xavi", "Al Sadd, QAT")])
            .await
            .unwrap();
        writer.append_batch(&target, &[record("Busquets", "FC Barcelona")]).await.unwrap();

        let rows = read_rows(&target.output_path);
        let names: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(names, ["name", "Iniesta", "Xavi", "Busquets"]);
        assert_eq!(rows[2][1], "Al Sadd, QAT");
        assert!(rows.iter().all(|r| r.len() == 9));
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let target = EditionTarget::new("16", "fifa", dir.path());
        let writer = CsvEditionWriter::new();
        writer.initialize(&target, &schema()).await.unwrap();
        writer.append_batch(&target, &[]).await.unwrap();
        assert_eq!(read_rows(&target.output_path).len(), 1);
    }

    #[tokio::test]
    async fn test_append_without_initialize_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let target = EditionTarget::new("15", "fifa", dir.path());
        let err = CsvEditionWriter::new()
            .append_batch(&target, &[record("A", "B")])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_initialize_fails_when_store_cannot_be_created() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "a file, not a directory").unwrap();
        let target = EditionTarget::new("15", "fifa", &blocker);
        let err = CsvEditionWriter::new()
            .initialize(&target, &schema())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Unavailable { .. }));
    }
}
