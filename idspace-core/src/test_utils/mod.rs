//! Test utilities shared across module test suites
//!
//! In-memory collaborators plus builders that wire an identity (and a space
//! on top of it) without touching the network or disk.

pub mod fixtures;

pub use fixtures::*;
