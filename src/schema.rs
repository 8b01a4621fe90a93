//! Output column schema.
//!
//! The schema file lists one field name per line: the 7 identity fields
//! followed by the attribute names in attribute-panel order. It is the
//! header row of every edition file and fixes every record's width.

use crate::error::SchemaError;
use crate::models::IDENTITY_FIELD_COUNT;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Ordered output field names, identity fields first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    field_names: Vec<String>,
}

impl Schema {
    /// Build a schema from field names.
    ///
    /// # Errors
    ///
    /// [`SchemaError::TooShort`] if fewer than the 7 identity fields are given.
    pub fn new(field_names: Vec<String>) -> Result<Self, SchemaError> {
        if field_names.len() < IDENTITY_FIELD_COUNT {
            return Err(SchemaError::TooShort {
                found: field_names.len(),
                required: IDENTITY_FIELD_COUNT,
            });
        }
        Ok(Self { field_names })
    }

    /// Parse newline-separated field names.
    ///
    /// Lines are trimmed and blank lines are ignored, so a trailing newline
    /// or CRLF line endings do not add columns.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let schema = Schema::parse("name\nclub\nnation\nage\nposition\noverall\npotential\npace\n")?;
    /// assert_eq!(schema.attribute_count(), 1);
    /// ```
    pub fn parse(text: &str) -> Result<Self, SchemaError> {
        let names = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();
        Self::new(names)
    }

    /// Read and parse the schema file at `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - Field-name file, one name per line
    ///
    /// # Returns
    ///
    /// The parsed [`Schema`].
    ///
    /// # Errors
    ///
    /// [`SchemaError::Read`] if the file cannot be read, or
    /// [`SchemaError::TooShort`] if it names fewer than 7 fields.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, SchemaError> {
        let text = fs::read_to_string(path)
            .await
            .map_err(|source| SchemaError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let schema = Self::parse(&text)?;
        info!(
            fields = schema.len(),
            attributes = schema.attribute_count(),
            "Loaded field-name schema"
        );
        Ok(schema)
    }

    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    /// Total record width, `7 + N`.
    pub fn len(&self) -> usize {
        self.field_names.len()
    }

    /// Number of attribute columns, `N`.
    pub fn attribute_count(&self) -> usize {
        self.field_names.len() - IDENTITY_FIELD_COUNT
    }
}
