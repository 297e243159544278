//! Store reducer test suite
