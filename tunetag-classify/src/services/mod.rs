//! Services backing the HTTP handlers

pub mod upload_store;

pub use upload_store::{UploadError, UploadStore};
