//! Shared test helpers: Parquet manifest fixtures and an event-recording observer.

use std::fs::File;
use std::path::Path;
use std::sync::{Arc, Mutex};

use parquet::data_type::{ByteArray, ByteArrayType, Int64Type};
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::parser::parse_message_type;

use crate::observer::Observer;
use crate::types::Event;

/// One manifest row with the reference column layout (`id` is INT64, the rest UTF8)
#[derive(Clone, Debug, Default)]
pub(crate) struct ManifestRow {
    pub(crate) id: Option<i64>,
    pub(crate) identifier: Option<String>,
    pub(crate) foo: Option<String>,
    pub(crate) format: Option<String>,
}

impl ManifestRow {
    /// A fully populated row
    pub(crate) fn new(id: i64, identifier: &str, foo: &str, format: &str) -> Self {
        Self {
            id: Some(id),
            identifier: Some(identifier.to_string()),
            foo: Some(foo.to_string()),
            format: Some(format.to_string()),
        }
    }
}

const MANIFEST_SCHEMA: &str = "
    message schema {
        OPTIONAL INT64 id;
        OPTIONAL BYTE_ARRAY identifier (UTF8);
        OPTIONAL BYTE_ARRAY foo (UTF8);
        OPTIONAL BYTE_ARRAY format (UTF8);
        OPTIONAL BYTE_ARRAY caption (UTF8);
    }
";

fn def_levels<T>(values: &[Option<T>]) -> Vec<i16> {
    values.iter().map(|v| i16::from(v.is_some())).collect()
}

fn write_optional_strings(
    row_group: &mut parquet::file::writer::SerializedRowGroupWriter<'_, File>,
    values: &[Option<String>],
) {
    let mut col_writer = row_group.next_column().unwrap().unwrap();
    let present = values
        .iter()
        .flatten()
        .map(|s| ByteArray::from(s.as_str()))
        .collect::<Vec<_>>();
    col_writer
        .typed::<ByteArrayType>()
        .write_batch(&present, Some(&def_levels(values)), None)
        .unwrap();
    col_writer.close().unwrap();
}

/// Write a manifest with one Parquet row group per entry of `row_groups`
///
/// An extra `caption` column is included so projection is exercised.
pub(crate) fn write_manifest(path: &Path, row_groups: &[Vec<ManifestRow>]) {
    let schema = Arc::new(parse_message_type(MANIFEST_SCHEMA).unwrap());
    let props = Arc::new(WriterProperties::builder().build());
    let file = File::create(path).unwrap();
    let mut writer = SerializedFileWriter::new(file, schema, props).unwrap();

    for rows in row_groups {
        let mut row_group = writer.next_row_group().unwrap();

        let ids = rows.iter().map(|r| r.id).collect::<Vec<_>>();
        let mut col_writer = row_group.next_column().unwrap().unwrap();
        let present = ids.iter().flatten().copied().collect::<Vec<_>>();
        col_writer
            .typed::<Int64Type>()
            .write_batch(&present, Some(&def_levels(&ids)), None)
            .unwrap();
        col_writer.close().unwrap();

        let identifiers = rows.iter().map(|r| r.identifier.clone()).collect::<Vec<_>>();
        write_optional_strings(&mut row_group, &identifiers);
        let foos = rows.iter().map(|r| r.foo.clone()).collect::<Vec<_>>();
        write_optional_strings(&mut row_group, &foos);
        let formats = rows.iter().map(|r| r.format.clone()).collect::<Vec<_>>();
        write_optional_strings(&mut row_group, &formats);
        let captions = rows
            .iter()
            .map(|_| Some("unused".to_string()))
            .collect::<Vec<_>>();
        write_optional_strings(&mut row_group, &captions);

        assert!(row_group.next_column().unwrap().is_none());
        row_group.close().unwrap();
    }

    writer.close().unwrap();
}

/// Write a single-row-group manifest whose columns are all optional UTF8 strings
pub(crate) fn write_string_columns(path: &Path, columns: &[(&str, Vec<Option<&str>>)]) {
    let fields = columns
        .iter()
        .map(|(name, _)| format!("OPTIONAL BYTE_ARRAY {name} (UTF8);"))
        .collect::<Vec<_>>()
        .join("\n");
    let message = format!("message schema {{ {fields} }}");
    let schema = Arc::new(parse_message_type(&message).unwrap());
    let props = Arc::new(WriterProperties::builder().build());
    let file = File::create(path).unwrap();
    let mut writer = SerializedFileWriter::new(file, schema, props).unwrap();

    let mut row_group = writer.next_row_group().unwrap();
    for (_, values) in columns {
        let owned = values
            .iter()
            .map(|v| v.map(str::to_string))
            .collect::<Vec<_>>();
        write_optional_strings(&mut row_group, &owned);
    }
    row_group.close().unwrap();
    writer.close().unwrap();
}

/// Observer that keeps every event for later assertions
#[derive(Default)]
pub(crate) struct RecordingObserver {
    events: Mutex<Vec<Event>>,
}

impl RecordingObserver {
    /// Snapshot of the events seen so far
    pub(crate) fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Count events matching a predicate
    pub(crate) fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| predicate(e)).count()
    }
}

impl Observer for RecordingObserver {
    fn on_event(&self, event: &Event) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Observer that tracks how many fetches are in flight and the peak seen
#[derive(Default)]
pub(crate) struct InFlightObserver {
    current: std::sync::atomic::AtomicUsize,
    peak: std::sync::atomic::AtomicUsize,
}

impl InFlightObserver {
    /// Highest number of simultaneous fetches observed
    pub(crate) fn peak(&self) -> usize {
        self.peak.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl Observer for InFlightObserver {
    fn on_event(&self, event: &Event) {
        use std::sync::atomic::Ordering;
        match event {
            Event::FetchStarted { .. } => {
                let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
            }
            Event::FetchFinished { .. } => {
                self.current.fetch_sub(1, Ordering::SeqCst);
            }
            _ => {}
        }
    }
}
