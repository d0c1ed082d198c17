#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Shared utilities for scriptfilter.
//!
//! Pure helper functions with no logging/tracing dependencies. The cache and
//! the dependency installer in `scriptfilter-core` build on these.

pub mod fs;
pub mod hash;
pub mod text;
