use std::path::PathBuf;

use crate::filelistitem::FileListItem;

/// The files selected for one batch, in directory enumeration order.
#[derive(Clone, Debug, Default)]
pub struct FileList {
    pub items: Vec<FileListItem>,
}

impl FileList {
    pub fn new() -> Self {
        FileList { items: vec![] }
    }

    pub fn insert(&mut self, item: FileListItem) {
        self.items.push(item);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.items.iter().map(|i| i.path.clone()).collect()
    }

    pub fn total_size(&self) -> u64 {
        self.items.iter().map(|i| i.size).sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileListItem> {
        self.items.iter()
    }
}
