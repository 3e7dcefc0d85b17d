// Library root: exposes the snapshot engine and the serving layer for
// integration tests in `tests/`. Production entry point is `src/main.rs`.

pub mod api;
pub mod cache;
pub mod chains;
pub mod consensus;
pub mod error;
pub mod fetch_meta;
pub mod gas;
pub mod metrics;
pub mod orchestrator;
pub mod price;
pub mod scheduler;
pub mod services;
pub mod speed;
pub mod state;
pub mod types;

// Binary-only plumbing, public so the entry point can reach it.
pub mod cli;
pub mod config;
pub mod logging;
