//! Directory scanning
//!
//! Lists class source files with their modification times. Anonymous
//! directories are scanned at the top level only, namespace directories
//! recursively.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tether_core::{Result, SetupError};
use tracing::debug;
use walkdir::WalkDir;

/// Extensions scanned when a scope sets none
pub const DEFAULT_EXTENSIONS: &[&str] = &["rs"];

/// Class source file found by a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Full path
    pub path: PathBuf,

    /// Subdirectories relative to the scanned root, then the file stem
    pub segments: Vec<String>,

    /// Modification time, in seconds since the epoch
    pub modified: u64,
}

impl ScannedFile {
    /// Class name declared by the file (its stem)
    pub fn class_name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }
}

/// Check that a path is an existing directory
pub fn check_directory(path: &Path) -> Result<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(SetupError::invalid_directory(path, "not a directory").into()),
        Err(e) => Err(SetupError::invalid_directory(path, e).into()),
    }
}

/// Modification time of a file, in seconds since the epoch
pub fn file_timestamp(path: &Path) -> std::io::Result<u64> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(seconds_since_epoch(modified))
}

fn seconds_since_epoch(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// List class files under `root` whose extension is in `extensions`
///
/// Hidden entries and files whose names are not identifiers are skipped.
/// Results are sorted by path.
pub fn scan_directory(root: &Path, recursive: bool, extensions: &[String]) -> Result<Vec<ScannedFile>> {
    check_directory(root)?;

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name().to_str().is_some_and(|s| !s.starts_with('.')))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(root = %root.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let matches_extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|e| e == ext));
        if !matches_extension {
            continue;
        }

        let Some(segments) = class_segments(root, path) else {
            debug!(path = %path.display(), "Skipping file without an identifier name");
            continue;
        };

        let modified = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .map(seconds_since_epoch)
            .unwrap_or(0);

        files.push(ScannedFile {
            path: path.to_path_buf(),
            segments,
            modified,
        });
    }

    Ok(files)
}

fn class_segments(root: &Path, path: &Path) -> Option<Vec<String>> {
    let relative = path.strip_prefix(root).ok()?;
    let mut segments: Vec<String> = relative
        .parent()
        .into_iter()
        .flat_map(|parent| parent.components())
        .map(|c| c.as_os_str().to_str().map(str::to_string))
        .collect::<Option<_>>()?;
    segments.push(path.file_stem()?.to_str()?.to_string());

    segments
        .iter()
        .all(|s| is_identifier(s))
        .then_some(segments)
}

/// Check that a name segment is an identifier
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;

    fn touch(path: &Path, secs: u64) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let file = File::create(path).unwrap();
        file.set_modified(UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    fn rs() -> Vec<String> {
        vec!["rs".to_string()]
    }

    #[test]
    fn test_top_level_scan() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Users.rs"), 1_000);
        touch(&dir.path().join("Sample.rs"), 2_000);
        touch(&dir.path().join("notes.txt"), 3_000);
        touch(&dir.path().join("admin/Roles.rs"), 4_000);

        let files = scan_directory(dir.path(), false, &rs()).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.class_name()).collect();
        assert_eq!(names, vec!["Sample", "Users"]);
        assert_eq!(files[0].modified, 2_000);
    }

    #[test]
    fn test_recursive_scan() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Users.rs"), 1);
        touch(&dir.path().join("admin/Roles.rs"), 2);
        touch(&dir.path().join(".hidden/Secret.rs"), 3);

        let files = scan_directory(dir.path(), true, &rs()).unwrap();
        let segments: Vec<_> = files.iter().map(|f| f.segments.join("::")).collect();
        assert_eq!(segments, vec!["Users", "admin::Roles"]);
    }

    #[test]
    fn test_custom_extensions() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Users.rs"), 1);
        touch(&dir.path().join("Report.class"), 1);

        let files = scan_directory(dir.path(), false, &["class".to_string()]).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].class_name(), "Report");
    }

    #[test]
    fn test_non_identifier_files_skipped() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("my-file.rs"), 1);
        touch(&dir.path().join("2fast.rs"), 1);

        assert!(scan_directory(dir.path(), false, &rs()).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.rs");
        touch(&file, 1);

        assert!(scan_directory(&dir.path().join("missing"), false, &rs()).is_err());
        assert!(scan_directory(&file, false, &rs()).is_err());
    }

    #[test]
    fn test_file_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Sample.rs");
        touch(&file, 42);
        assert_eq!(file_timestamp(&file).unwrap(), 42);
        assert!(file_timestamp(&dir.path().join("nope.rs")).is_err());
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("Users"));
        assert!(is_identifier("_private2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("9lives"));
        assert!(!is_identifier("a.b"));
    }
}
