use std::fmt::Display;
use std::path::{Path, PathBuf};

use crate::fstools::bytes_to_mib;

const VIDEO_EXTENSIONS: [&str; 3] = [".mp4", ".mkv", ".MP4"];
const CONVERTED_PREFIX: &str = "converted";

/// One candidate file of a job list.
#[derive(Clone, Debug, PartialEq)]
pub struct FileListItem {
    pub path: PathBuf,
    pub size: u64,
}

impl FileListItem {
    pub fn new(path: PathBuf, size: u64) -> Self {
        FileListItem { path, size }
    }

    /// Only `.mp4`, `.mkv` and `.MP4` are accepted; other casings are not.
    pub fn is_candidate_name(file_name: &str) -> bool {
        VIDEO_EXTENSIONS.iter().any(|ext| file_name.ends_with(ext))
            && !file_name.starts_with(CONVERTED_PREFIX)
    }

    pub fn file_name(&self) -> String {
        file_name_of(&self.path)
    }

    pub fn size_mib(&self) -> f64 {
        bytes_to_mib(self.size)
    }
}

pub fn file_name_of(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().to_string(),
        None => path.display().to_string(),
    }
}

impl Display for FileListItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {:.2} MB", self.file_name(), self.size_mib())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_candidate_name() {
        assert!(FileListItem::is_candidate_name("movie.mp4"));
        assert!(FileListItem::is_candidate_name("movie.mkv"));
        assert!(FileListItem::is_candidate_name("MOVIE.MP4"));
        assert!(!FileListItem::is_candidate_name("movie.MKV"));
        assert!(!FileListItem::is_candidate_name("movie.Mp4"));
        assert!(!FileListItem::is_candidate_name("movie.avi"));
        assert!(!FileListItem::is_candidate_name("notes.txt"));
        assert!(!FileListItem::is_candidate_name("converted_movie.mp4"));
        assert!(!FileListItem::is_candidate_name("converted.mkv"));
    }

    #[test]
    fn test_display() {
        let item = FileListItem::new(PathBuf::from("/videos/movie.mkv"), 5 * 1024 * 1024 + 512 * 1024);
        assert_eq!(format!("{}", item), "movie.mkv - 5.50 MB");
    }
}
