//! Manifest reading. Opens the Parquet source and streams row groups as [`MetadataRecord`]s.
//!
//! Opening validates the schema once. Each row group is then read through its own
//! single-group reader, so a caller holds one lazily decoded group at a time and groups are
//! produced strictly in index order.

use std::fs::File;
use std::path::{Path, PathBuf};

use parquet::file::metadata::RowGroupMetaData;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::file::serialized_reader::ReadOptionsBuilder;
use parquet::record::Field;
use parquet::record::reader::RowIter;
use parquet::schema::types::{Type, TypePtr};

use crate::config::ColumnMapping;
use crate::error::{Error, Result};
use crate::types::MetadataRecord;


/// An opened, schema-checked manifest
#[derive(Debug)]
pub struct MetadataReader {
    path: PathBuf,
    columns: ColumnMapping,
    projection: Type,
    row_group_rows: Vec<u64>,
}

impl MetadataReader {
    /// Open `path` and check that every mapped column exists
    ///
    /// # Errors
    ///
    /// - [`Error::Open`] if the file cannot be opened or is not Parquet
    /// - [`Error::Schema`] if required columns are absent
    pub fn open(path: &Path, columns: &ColumnMapping) -> Result<Self> {
        let open_err = |reason: String| Error::Open {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|e| open_err(e.to_string()))?;
        let reader = SerializedFileReader::new(file).map_err(|e| open_err(e.to_string()))?;
        let metadata = reader.metadata();
        let schema = metadata.file_metadata().schema();

        let mut projected: Vec<TypePtr> = Vec::with_capacity(4);
        let mut missing = Vec::new();
        for name in columns.names() {
            if projected.iter().any(|f| f.name() == name) {
                continue;
            }
            match schema.get_fields().iter().find(|f| f.name() == name) {
                Some(field) => projected.push(field.clone()),
                None => missing.push(name.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(Error::Schema {
                path: path.to_path_buf(),
                missing,
            });
        }

        let projection = Type::group_type_builder(schema.name())
            .with_fields(projected)
            .build()
            .map_err(|e| open_err(format!("invalid projection: {e}")))?;

        let row_group_rows = metadata
            .row_groups()
            .iter()
            .map(|rg| u64::try_from(rg.num_rows()).unwrap_or(0))
            .collect();

        tracing::debug!(
            path = %path.display(),
            row_groups = metadata.num_row_groups(),
            rows = metadata.file_metadata().num_rows(),
            "Opened manifest"
        );

        Ok(Self {
            path: path.to_path_buf(),
            columns: columns.clone(),
            projection,
            row_group_rows,
        })
    }

    /// Path of the manifest
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of row groups in the manifest
    pub fn num_row_groups(&self) -> usize {
        self.row_group_rows.len()
    }

    /// Row count of a row group, from the file footer
    pub fn row_group_len(&self, index: usize) -> Option<u64> {
        self.row_group_rows.get(index).copied()
    }

    /// Lazily decode row group `index`
    ///
    /// The returned iterator is finite and cannot be restarted; call again to re-read.
    pub fn row_group(&self, index: usize) -> Result<RowGroupRecords> {
        let read_err = |reason: String| Error::Read {
            row_group: index,
            reason,
        };

        if index >= self.num_row_groups() {
            return Err(read_err(format!(
                "index out of range (manifest has {} row groups)",
                self.num_row_groups()
            )));
        }

        let file = File::open(&self.path).map_err(|e| read_err(e.to_string()))?;
        let options = ReadOptionsBuilder::new()
            .with_predicate(Box::new(move |_: &RowGroupMetaData, i: usize| i == index))
            .build();
        let reader = SerializedFileReader::new_with_options(file, options)
            .map_err(|e| read_err(e.to_string()))?;
        let rows = RowIter::from_file_into(Box::new(reader))
            .project(Some(self.projection.clone()))
            .map_err(|e| read_err(e.to_string()))?;

        Ok(RowGroupRecords {
            index,
            rows,
            columns: self.columns.clone(),
        })
    }
}

/// Records of a single row group, decoded on demand
pub struct RowGroupRecords {
    index: usize,
    rows: RowIter<'static>,
    columns: ColumnMapping,
}

impl RowGroupRecords {
    /// Index of the row group being read
    pub fn index(&self) -> usize {
        self.index
    }
}

impl Iterator for RowGroupRecords {
    type Item = Result<MetadataRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = match self.rows.next()? {
            Ok(row) => row,
            Err(e) => {
                return Some(Err(Error::Read {
                    row_group: self.index,
                    reason: e.to_string(),
                }));
            }
        };

        let mut record = MetadataRecord::default();
        for (name, field) in row.get_column_iter() {
            let value = || field_to_string(field);
            if *name == self.columns.id {
                record.id = value();
            }
            if *name == self.columns.url {
                record.url = value();
            }
            if *name == self.columns.category {
                record.category = value();
            }
            if *name == self.columns.media_type {
                record.media_type = value();
            }
        }
        Some(Ok(record))
    }
}

/// Stringify a scalar cell; nulls and NaNs are missing values
pub(crate) fn field_to_string(field: &Field) -> Option<String> {
    match field {
        Field::Null => None,
        Field::Float(v) if v.is_nan() => None,
        Field::Double(v) if v.is_nan() => None,
        Field::Str(s) => Some(s.clone()),
        Field::Bytes(b) => Some(String::from_utf8_lossy(b.data()).into_owned()),
        other => Some(other.to_string()),
    }
}
