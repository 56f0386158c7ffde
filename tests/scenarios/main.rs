//! Scenario tests driving the engine with scripted tools

#[path = "../common/mod.rs"]
mod common;

mod cancellation;
mod continue_on_failure;
mod coverage_history;
mod from_config;
mod report;
mod setup;
