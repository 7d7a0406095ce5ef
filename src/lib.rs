//! Benchmark of interchangeable strategies for the weighted absolute
//! deviation sum of an integer sequence.

pub mod bench;
pub mod config;
pub mod counts;
pub mod deviation;
pub mod input;
pub mod manager;
pub mod stats;
