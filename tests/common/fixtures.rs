//! Parquet manifest fixtures

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use parquet::data_type::{ByteArray, ByteArrayType};
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::parser::parse_message_type;

/// One manifest row: `(id, identifier, foo, format)`, each optional
pub type Row<'a> = (
    Option<&'a str>,
    Option<&'a str>,
    Option<&'a str>,
    Option<&'a str>,
);

/// Write a manifest with the reference column names, one Parquet row group per entry
///
/// Every column is an optional UTF8 string.
pub fn write_manifest(path: &Path, row_groups: &[Vec<Row<'_>>]) {
    let schema = parse_message_type(
        "
        message manifest {
            OPTIONAL BYTE_ARRAY id (UTF8);
            OPTIONAL BYTE_ARRAY identifier (UTF8);
            OPTIONAL BYTE_ARRAY foo (UTF8);
            OPTIONAL BYTE_ARRAY format (UTF8);
        }
        ",
    )
    .expect("valid schema");
    let props = Arc::new(WriterProperties::builder().build());
    let file = File::create(path).expect("create manifest");
    let mut writer =
        SerializedFileWriter::new(file, Arc::new(schema), props).expect("manifest writer");

    for rows in row_groups {
        let mut row_group = writer.next_row_group().expect("row group");
        let columns: [Vec<Option<&str>>; 4] = [
            rows.iter().map(|r| r.0).collect(),
            rows.iter().map(|r| r.1).collect(),
            rows.iter().map(|r| r.2).collect(),
            rows.iter().map(|r| r.3).collect(),
        ];
        for values in &columns {
            let present = values
                .iter()
                .flatten()
                .map(|v| ByteArray::from(*v))
                .collect::<Vec<_>>();
            let levels = values
                .iter()
                .map(|v| i16::from(v.is_some()))
                .collect::<Vec<_>>();
            let mut column = row_group
                .next_column()
                .expect("next column")
                .expect("column exists");
            column
                .typed::<ByteArrayType>()
                .write_batch(&present, Some(&levels), None)
                .expect("write column");
            column.close().expect("close column");
        }
        row_group.close().expect("close row group");
    }
    writer.close().expect("close manifest");
}
