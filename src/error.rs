use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by the fixture core. None of them are retried internally.
#[derive(Error, Debug)]
pub enum FixtureError {
    /// A subprocess exited with a code outside the accepted set
    #[error("command {command:?} returned {}: \"\"\"{output}\"\"\"", display_code(.code))]
    CommandFailure {
        command: String,
        /// `None` when the process was terminated by a signal
        code: Option<i32>,
        output: String,
    },

    /// The executable could not be launched
    #[error("could not run {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Compose reported no public binding for the port
    #[error("could not detect port for \"{service}:{port}\"")]
    PortResolution { service: String, port: u16 },

    /// Compose printed something that is not a `host:port` endpoint
    #[error("unexpected endpoint {endpoint:?} for \"{service}:{port}\"")]
    InvalidEndpoint {
        service: String,
        port: u16,
        endpoint: String,
    },

    #[error("timeout reached after {timeout:?} while waiting on service \"{service}:{port}\"")]
    ServiceTimeout {
        service: String,
        port: u16,
        timeout: Duration,
    },

    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The registry was already torn down
    #[error("services were already shut down")]
    ShutDown,
}

pub type Result<T> = std::result::Result<T, FixtureError>;

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "no exit code".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failure_message_contains_output() {
        let err = FixtureError::CommandFailure {
            command: "docker compose ps".to_string(),
            code: Some(1),
            output: "boom\n".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("returned 1"));
        assert!(msg.contains("boom"));
    }

    #[test]
    fn signal_termination_has_readable_code() {
        let err = FixtureError::CommandFailure {
            command: "sleep 10".to_string(),
            code: None,
            output: String::new(),
        };

        assert!(err.to_string().contains("no exit code"));
    }

    #[test]
    fn timeout_message_names_the_service() {
        let err = FixtureError::ServiceTimeout {
            service: "hello".to_string(),
            port: 80,
            timeout: Duration::from_millis(250),
        };

        assert!(err.to_string().contains("\"hello:80\""));
    }
}
