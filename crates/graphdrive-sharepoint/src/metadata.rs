//! Mapping from Graph `DriveItem` resources to facade [`Metadata`].

use crate::types::DriveItem;
use chrono::DateTime;
use graphdrive_fs::Metadata;

/// Build the facade record for `item`, reported under `path`.
pub fn normalize_item(item: &DriveItem, path: &str) -> Metadata {
    let mut meta = if item.is_folder() {
        Metadata::dir(path)
    } else {
        Metadata::file(path)
    };
    if let Some(size) = item.size.filter(|s| *s >= 0) {
        meta = meta.with_size(size as u64);
    }
    meta.timestamp = item
        .last_modified_date_time
        .as_deref()
        .and_then(parse_timestamp);
    meta.mimetype = item.file.as_ref().and_then(|f| f.mime_type.clone());
    meta.url = item.web_url.clone();
    meta
}

/// RFC 3339 → unix seconds.
pub fn parse_timestamp(value: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.timestamp())
}
