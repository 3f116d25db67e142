pub mod chunk_upload;
pub mod file_complete;
pub mod file_delete;
pub mod file_download;
pub mod file_get;
pub mod health;
pub mod objects;
pub mod storage_health;
pub mod upload_init;
