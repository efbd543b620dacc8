//! Data models for the Library API

pub mod book;

// Re-export commonly used types
pub use book::{Book, BookMetadata, BookPatch, BookQuery, BookStatus, CreateBook};
