mod checkers;
mod compose_adapter;
pub mod config;
mod process_runner;

pub use checkers::{HttpChecker, TcpChecker};
pub use compose_adapter::ComposeExecutor;
pub use config::FixtureConfig;
pub use process_runner::ProcessRunner;
