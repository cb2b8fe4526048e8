use super::card_store::CardStore;
use super::fs_backend::FsBackend;
use std::path::{Path, PathBuf};

pub type FileCardStore = CardStore<FsBackend>;

impl FileCardStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        CardStore::with_backend(FsBackend::new(data_dir))
    }

    pub fn data_dir(&self) -> &Path {
        self.backend.root()
    }
}
