//! Cloudflare R2 storage client.
//!
//! This crate provides:
//! - Byte and file uploads to R2
//! - Presigned and public URLs for stored objects
//! - Object existence checks and deletion

pub mod client;
pub mod error;

pub use client::{validate_key, R2Client, R2Config};
pub use error::{StorageError, StorageResult};
