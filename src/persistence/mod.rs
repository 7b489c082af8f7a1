//! Persistence layer: on-disk encodings and storage backends.

pub mod serialization;
pub mod storage;
