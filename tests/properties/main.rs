//! Property-based test suite entry point.

mod flatten_tests;
