//! Integration test suite entry point.

mod fixture;
mod pipeline_tests;
