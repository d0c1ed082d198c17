#![deny(clippy::all)]
#![warn(clippy::pedantic)]

//! Benchmark harness for scriptfilter.
//!
//! Run benchmarks with: `cargo bench -p scriptfilter-bench`
//!
//! Workflow processes start on every keystroke, so the hot paths are document
//! serialization, the cache probe and manifest fingerprinting.
