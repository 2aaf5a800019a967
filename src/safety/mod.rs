//! The safety subsystem: interlock evaluation, exposure parameter validation, the
//! emergency shutdown sequencer, and the mid-exposure monitor.

pub mod emergency;
pub mod interlocks;
pub mod monitor;
pub mod parameters;
