//! Space orchestrator test suite

mod subscription_tests;
