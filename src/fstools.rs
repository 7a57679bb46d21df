use std::fs;
use std::path::Path;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

#[derive(Debug, PartialEq)]
pub enum DirEntryCategory {
    DoesNotExist,
    RegularFile,
    Directory,
    Unknown,
}

/// Classifies a path after following symlinks, so a link to a directory
/// counts as a directory.
pub fn classify_path(path: &Path) -> DirEntryCategory {
    match fs::metadata(path) {
        Ok(metadata) => {
            if metadata.is_file() {
                DirEntryCategory::RegularFile
            } else if metadata.is_dir() {
                DirEntryCategory::Directory
            } else {
                DirEntryCategory::Unknown
            }
        },
        Err(_) => DirEntryCategory::DoesNotExist,
    }
}

pub fn bytes_to_mib(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MIB
}
