//! The write-ahead journal: durable entries, the append-only writer, and crash
//! recovery.

pub mod entry;
pub mod recovery;
pub mod writer;
