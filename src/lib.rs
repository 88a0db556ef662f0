#[macro_use]
extern crate tracing;

pub mod cli;
pub mod config;
pub mod errors;
pub mod filters;
pub mod http;
pub mod inventory;
pub mod k8s;
pub mod orchestrator;
pub mod plan;
pub mod progress;
pub mod registry;
pub mod reporter;
