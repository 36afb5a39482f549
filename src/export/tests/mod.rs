//! Tests for the export pipeline

mod orchestrator_tests;
mod manager_tests;
