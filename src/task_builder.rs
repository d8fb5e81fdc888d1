//! Record validation and destination path derivation.
//!
//! Pure functions: nothing here touches the filesystem.

use std::path::Path;

use crate::types::{DownloadTask, MetadataRecord, SkipReason};

/// Extension for a media type: the part after the last `/`, or the whole value if it has none
///
/// `image/jpeg` yields `jpeg`; `png` yields `png`.
pub fn extension_for(media_type: &str) -> &str {
    match media_type.rfind('/') {
        Some(pos) => &media_type[pos + 1..],
        None => media_type,
    }
}

/// A relative path that stays inside its parent directory
///
/// `/` separated segments are allowed so nested categories such as `a/b` keep working, but
/// absolute paths, empty, `.` and `..` segments, backslashes and NUL are not.
fn is_contained(value: &str) -> bool {
    !value.is_empty()
        && !value.starts_with('/')
        && !value.contains('\\')
        && !value.contains('\0')
        && value
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

/// Turn a record into a task rooted at `output_root`, or say why it is skipped
///
/// Validation order: id, url, category, then media type. The destination is
/// `<output_root>/<id>/<category>.<extension>`.
pub fn build_task(
    record: &MetadataRecord,
    output_root: &Path,
) -> std::result::Result<DownloadTask, SkipReason> {
    let id = record.id.as_deref().ok_or(SkipReason::MissingId)?;
    let url = record.url.as_deref().ok_or(SkipReason::MissingUrl)?;
    let category = record
        .category
        .as_deref()
        .ok_or(SkipReason::MissingCategory)?;
    let media_type = record
        .media_type
        .as_deref()
        .ok_or(SkipReason::MissingMediaType)?;

    if !is_contained(id) || !is_contained(category) {
        return Err(SkipReason::UnsafePathComponent);
    }

    let file_name = format!("{}.{}", category, extension_for(media_type));
    Ok(DownloadTask {
        source_url: url.to_string(),
        destination: output_root.join(id).join(file_name),
    })
}
