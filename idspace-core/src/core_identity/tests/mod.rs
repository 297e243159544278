//! Identity core test suite

mod bootstrap_tests;
mod persistence_tests;
