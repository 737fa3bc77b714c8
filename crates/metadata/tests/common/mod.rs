//! Test infrastructure for the resolver chain.

#![allow(dead_code)]

pub mod fixtures;

pub use fixtures::*;
