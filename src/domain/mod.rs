//! Pure domain types — no I/O, no async, no imports from outer layers.

pub mod error;
pub mod handle;
pub mod report;
pub mod request;
