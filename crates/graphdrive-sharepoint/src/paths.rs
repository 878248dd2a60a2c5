//! Graph path addressing.
//!
//! Items are addressed relative to a drive root using the colon syntax:
//! `drives/{drive-id}/root:/{path}:` followed by an optional action such
//! as `/content` or `/children`. The root itself is `drives/{id}/root`.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped inside a single path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b':')
    .add(b'\\')
    .add(b'^')
    .add(b'|');

/// Percent-encode a drive-relative path segment by segment, keeping `/`.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| utf8_percent_encode(s, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Address of the item at `path` inside `drive_id`.
pub fn item_path(drive_id: &str, path: &str) -> String {
    if path.is_empty() {
        format!("drives/{}/root", drive_id)
    } else {
        format!("drives/{}/root:/{}:", drive_id, encode_path(path))
    }
}

/// Address of an action (`content`, `children`, `createUploadSession`, …)
/// on the item at `path`.
pub fn item_action(drive_id: &str, path: &str, action: &str) -> String {
    format!("{}/{}", item_path(drive_id, path), action)
}

/// Split `Library/rest/of/path` into the library name and the remainder.
pub fn split_drive(path: &str) -> (&str, &str) {
    match path.split_once('/') {
        Some((drive, rest)) => (drive, rest),
        None => (path, ""),
    }
}

/// Re-prefix a drive-relative path with its library name.
pub fn with_drive(drive: &str, path: &str) -> String {
    if path.is_empty() {
        drive.to_string()
    } else {
        format!("{}/{}", drive, path)
    }
}

/// Drive-relative path of an item from its `parentReference.path`, e.g.
/// `/drives/b!xyz/root:/Reports/2024` + `q1.xlsx` → `Reports/2024/q1.xlsx`.
pub fn path_from_parent(parent_path: Option<&str>, name: &str) -> Option<String> {
    let parent = parent_path?;
    let (_, rest) = parent.split_once("root:")?;
    let rest = percent_encoding::percent_decode_str(rest)
        .decode_utf8_lossy()
        .trim_matches('/')
        .to_string();
    Some(if rest.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", rest, name)
    })
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_path() {
        assert_eq!(encode_path("Reports/Q1 2024.xlsx"), "Reports/Q1%202024.xlsx");
        assert_eq!(encode_path("a#b/c?d"), "a%23b/c%3Fd");
        assert_eq!(encode_path("ünï/cödé.txt"), "%C3%BCn%C3%AF/c%C3%B6d%C3%A9.txt");
    }

    #[test]
    fn test_item_path() {
        assert_eq!(item_path("d1", ""), "drives/d1/root");
        assert_eq!(item_path("d1", "a/b.txt"), "drives/d1/root:/a/b.txt:");
        assert_eq!(
            item_action("d1", "a/b.txt", "content"),
            "drives/d1/root:/a/b.txt:/content"
        );
        assert_eq!(item_action("d1", "", "children"), "drives/d1/root/children");
    }

    #[test]
    fn test_split_drive() {
        assert_eq!(split_drive("Documents/a/b.txt"), ("Documents", "a/b.txt"));
        assert_eq!(split_drive("Documents"), ("Documents", ""));
        assert_eq!(split_drive(""), ("", ""));
        assert_eq!(with_drive("Documents", "a.txt"), "Documents/a.txt");
        assert_eq!(with_drive("Documents", ""), "Documents");
    }

    #[test]
    fn test_path_from_parent() {
        assert_eq!(
            path_from_parent(Some("/drives/b!x/root:"), "a.txt").as_deref(),
            Some("a.txt")
        );
        assert_eq!(
            path_from_parent(Some("/drives/b!x/root:/Q1%202024/deep"), "a.txt").as_deref(),
            Some("Q1 2024/deep/a.txt")
        );
        assert_eq!(path_from_parent(None, "a.txt"), None);
    }
}
