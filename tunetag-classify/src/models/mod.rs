//! Request and response models for the HTTP surface

pub mod process;

pub use process::{ErrorBody, ProcessRequest, ProcessResponse, Seconds, ValidatedRequest};
