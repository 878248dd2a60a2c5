//! Path normalisation and small path helpers.
//!
//! Paths handled by the facade are always relative to the adapter root,
//! use `/` as the separator, and never start or end with one. The root
//! itself is the empty string.

use crate::error::{FsError, FsResult};

/// Normalise a user-supplied path.
///
/// Backslashes become slashes, control and zero-width characters are
/// stripped, `.` segments and repeated separators disappear, and `..`
/// pops the previous segment. Climbing above the root is an error.
pub fn normalize_path(path: &str) -> FsResult<String> {
    let cleaned: String = path
        .chars()
        .filter(|c| !is_funky(*c))
        .map(|c| if c == '\\' { '/' } else { c })
        .collect();

    let mut parts: Vec<&str> = Vec::new();
    for segment in cleaned.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(FsError::OutsideRoot(path.to_string()));
                }
            }
            s => parts.push(s),
        }
    }

    Ok(parts.join("/"))
}

fn is_funky(c: char) -> bool {
    c.is_control() || matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}')
}

/// Parent directory of a normalised path (`""` for top-level entries).
pub fn dirname(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Last segment of a normalised path.
pub fn basename(path: &str) -> &str {
    path.rsplit_once('/').map(|(_, name)| name).unwrap_or(path)
}

/// Extension of the last segment, without the dot.
///
/// Dot-files such as `.env` have no extension.
pub fn extension(path: &str) -> Option<&str> {
    match basename(path).rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => Some(ext),
        _ => None,
    }
}

/// Last segment without its extension.
pub fn filename(path: &str) -> &str {
    let base = basename(path);
    match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    }
}

/// Join a directory and a child name.
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Whether `path` sits somewhere beneath `dir` (the root contains everything).
pub fn resides_in(dir: &str, path: &str) -> bool {
    dir.is_empty()
        || path
            .strip_prefix(dir)
            .map(|rest| rest.starts_with('/'))
            .unwrap_or(false)
}
