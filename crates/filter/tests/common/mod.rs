//! Test infrastructure for the filter engine.

#![allow(dead_code)]

pub mod fixtures;

pub use fixtures::*;
