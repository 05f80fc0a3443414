use super::Commands;
use super::session::exit_code;
use crate::domain::{CommandRunner, ReadinessCheck, WaitOptions};
use crate::infra::config::FixtureConfig;
use crate::infra::{HttpChecker, ProcessRunner, TcpChecker};
use crate::services::{ServiceRegistry, Session};
use anyhow::{Context, Result};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

/// Resolved configuration plus the runner every compose call goes through.
pub struct Fixture {
    config: FixtureConfig,
    runner: Arc<dyn CommandRunner>,
}

impl Fixture {
    pub fn new(config: FixtureConfig) -> Self {
        Self::with_runner(config, Arc::new(ProcessRunner::new()))
    }

    pub fn with_runner(config: FixtureConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &FixtureConfig {
        &self.config
    }

    /// Registry for a single-shot command. These never tear down on exit:
    /// state is shared across invocations through the compose project.
    pub fn registry(&self) -> ServiceRegistry {
        ServiceRegistry::new(
            self.config.compose.clone(),
            self.config.docker_ip.clone(),
            self.runner.clone(),
        )
    }

    pub fn session(&self) -> Session {
        Session::with_runner(&self.config, self.runner.clone())
    }

    pub fn execute(&self, command: Commands) -> Result<ExitCode> {
        match command {
            Commands::Up { services } => {
                self.registry().start(&as_strs(&services))?;
            }
            Commands::Stop { services } => {
                self.registry().stop(&as_strs(&services))?;
            }
            Commands::Exec { service, command } => {
                let output = self.registry().exec(&service, &as_strs(&command))?;
                print!("{output}");
            }
            Commands::Port { service, port } => {
                let public = self.registry().port_for(&service, port)?;
                println!("{public}");
            }
            Commands::Wait {
                service,
                port,
                path,
                tcp,
                timeout,
                interval_ms,
            } => {
                let options = self.wait_options(timeout, interval_ms)?;
                let checker = checker_for(tcp, &path);
                let public = self
                    .registry()
                    .wait_for_service_with(&service, port, checker.as_ref(), options)?;
                println!("{public}");
            }
            Commands::Ps { args } => {
                print!("{}", self.registry().ps(&as_strs(&args))?);
            }
            Commands::Down => {
                self.registry().shutdown()?;
            }
            Commands::Run {
                services,
                tcp,
                command,
            } => {
                let checker = checker_for(tcp, "/");
                let status = self.run_suite(&services, checker.as_ref(), &command)?;
                return Ok(exit_code(status));
            }
        }

        Ok(ExitCode::SUCCESS)
    }

    fn wait_options(&self, timeout: Option<f64>, interval_ms: Option<u64>) -> Result<WaitOptions> {
        let mut options = self.config.wait;
        if let Some(secs) = timeout {
            options.timeout = Duration::try_from_secs_f64(secs)
                .with_context(|| format!("timeout inválido: {secs}"))?;
        }
        if let Some(ms) = interval_ms {
            options.poll_interval = Duration::from_millis(ms);
        }
        Ok(options)
    }
}

fn checker_for(tcp: bool, path: &str) -> Box<dyn ReadinessCheck> {
    if tcp {
        Box::new(TcpChecker::new())
    } else {
        Box::new(HttpChecker::with_path(path))
    }
}

fn as_strs(values: &[String]) -> Vec<&str> {
    values.iter().map(String::as_str).collect()
}
