//! Storage Adapter - 文件系统存储

mod file_storage;
mod temp_store;

pub use file_storage::FileAudioStorage;
pub use temp_store::LocalTempStore;
