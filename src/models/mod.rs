//! Data models for filingacquire.

mod filing;

pub use filing::{FilingRef, IndexEntry};
