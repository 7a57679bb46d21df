use std::fs;
use std::path::{self, Path, PathBuf};

use crate::error::ScanError;
use crate::filelist::FileList;
use crate::filelistitem::FileListItem;
use crate::fstools::{classify_path, DirEntryCategory};

/// Lists a single directory (no recursion) for convertible video files.
pub struct FileScanner {}

impl FileScanner {
    pub fn new() -> Self {
        FileScanner {}
    }

    pub fn scan(&self, dirpath: &Path) -> Result<FileList, ScanError> {
        let mut list = FileList::new();
        self.rescan(dirpath, &mut list)?;
        Ok(list)
    }

    /// Clears `list` and refills it from `dirpath`.
    pub fn rescan(&self, dirpath: &Path, list: &mut FileList) -> Result<(), ScanError> {
        list.clear();

        let dirpath = absolute_dir(dirpath)?;
        let entries = fs::read_dir(&dirpath).map_err(|e| ScanError::unlistable(&dirpath, e))?;
        for entry in entries.filter_map(|e| e.ok()) {
            let name = entry.file_name().to_string_lossy().to_string();
            if !FileListItem::is_candidate_name(&name) {
                continue;
            }

            let p = entry.path();
            match fs::metadata(&p) {
                Ok(metadata) if metadata.is_file() => list.insert(FileListItem::new(p, metadata.len())),
                Ok(_) => tracing::debug!("skipping {:?}, not a regular file", p),
                Err(err) => tracing::debug!("skipping {:?}: {}", p, err),
            }
        }

        tracing::debug!("found {} candidate(s) in {:?}", list.len(), dirpath);
        Ok(())
    }
}

fn absolute_dir(dirpath: &Path) -> Result<PathBuf, ScanError> {
    if classify_path(dirpath) != DirEntryCategory::Directory {
        return Err(ScanError::NotADirectory { path: dirpath.to_path_buf() });
    }
    path::absolute(dirpath).map_err(|e| ScanError::unlistable(&dirpath.to_path_buf(), e))
}
