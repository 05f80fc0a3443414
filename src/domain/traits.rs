use crate::error::Result;
use std::fmt::Debug;

/// Runs an external command without a shell and returns its merged output
pub trait CommandRunner: Send + Sync + Debug {
    /// Execute `command` (program followed by its arguments).
    ///
    /// Returns the combined stdout/stderr text when the exit code is in
    /// `success_codes`, otherwise `FixtureError::CommandFailure`.
    fn execute(&self, command: &[String], success_codes: &[i32]) -> Result<String>;
}

/// Probe deciding whether a service reachable at `host:port` accepts traffic.
///
/// Implementations must not fail: any error while probing means "not yet".
pub trait ReadinessCheck {
    fn is_ready(&self, host: &str, port: u16) -> bool;
}

impl<F> ReadinessCheck for F
where
    F: Fn(&str, u16) -> bool,
{
    fn is_ready(&self, host: &str, port: u16) -> bool {
        self(host, port)
    }
}
