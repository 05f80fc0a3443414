pub mod cli;
pub mod domain;
pub mod error;
pub mod infra;
pub mod services;

// Make test_support available for integration tests
pub mod test_support;

pub use domain::{
    CommandRunner, ComposeSpec, ComposeTool, ProjectName, ReadinessCheck, WaitOptions,
};
pub use error::{FixtureError, Result};
pub use infra::{ComposeExecutor, FixtureConfig, HttpChecker, ProcessRunner, TcpChecker};
pub use services::{ServiceRegistry, Session, poll_until};
