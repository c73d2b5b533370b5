//! # Quill Shared
//!
//! Wire types shared between the API server and the client store.

pub mod dto;
pub mod response;

pub use response::{ApiResponse, ErrorResponse, FieldIssue};
