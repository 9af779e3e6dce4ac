//! Event grouping.
//!
//! Groupers sit downstream of the detectors and coalesce related events
//! into incident groups. The temporal grouper shipped here groups by time
//! proximity within a single stream.

pub mod temporal;
