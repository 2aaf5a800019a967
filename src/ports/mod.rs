//! Abstract capability ports consumed by the engine. Adapters — real
//! hardware, simulators, or DICOM clients — are explicitly out of scope; this crate
//! defines the traits and ships in-memory mocks for testing.

pub mod aec;
pub mod detector;
pub mod dicom;
pub mod dose_tracker;
pub mod hvg;
pub mod mock;
pub mod safety_port;
