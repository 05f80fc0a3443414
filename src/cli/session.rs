use super::Fixture;
use crate::domain::{ReadinessCheck, WaitOptions};
use crate::services::Session;
use anyhow::{Context, Result, bail};
use std::process::{Command, ExitCode, ExitStatus};
use std::str::FromStr;
use tracing::{error, info, warn};

pub const DOCKER_IP_ENV: &str = "COMPOSE_FIXTURE_DOCKER_IP";

/// `SERVICE:PORT` as given to `run --service`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePort {
    pub service: String,
    pub port: u16,
}

impl ServicePort {
    /// Environment variable carrying the public port, e.g. `COMPOSE_FIXTURE_HELLO_WORLD_80`
    pub fn env_var(&self) -> String {
        let service: String = self
            .service
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("COMPOSE_FIXTURE_{service}_{}", self.port)
    }
}

impl FromStr for ServicePort {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (service, port) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("expected SERVICE:PORT, got {s:?}"))?;

        if service.trim().is_empty() {
            return Err(format!("empty service name in {s:?}"));
        }

        let port = port
            .parse::<u16>()
            .map_err(|e| format!("invalid port in {s:?}: {e}"))?;

        Ok(Self {
            service: service.to_string(),
            port,
        })
    }
}

impl Fixture {
    /// One full test session: start, wait, run `command`, tear down.
    ///
    /// Returns the exit status of `command`; the CLI turns it into its own
    /// exit code.
    /// Teardown runs even when waiting or the command fails; its own
    /// failure is reported after the command's.
    pub fn run_suite(
        &self,
        services: &[ServicePort],
        checker: &dyn ReadinessCheck,
        command: &[String],
    ) -> Result<ExitStatus> {
        let Some((program, args)) = command.split_first() else {
            bail!("nenhum comando de teste informado");
        };

        let mut session = self.session();
        let options = self.config().wait;

        let mut names: Vec<&str> = Vec::new();
        for sp in services {
            if !names.contains(&sp.service.as_str()) {
                names.push(&sp.service);
            }
        }

        let outcome = prepare(&mut session, &names, services, checker, options).and_then(|env| {
            info!(" Executando {}", command.join(" "));
            let status = Command::new(program)
                .args(args)
                .env(DOCKER_IP_ENV, session.docker_ip())
                .envs(env.iter().map(|(key, port)| (key.as_str(), port.to_string())))
                .status()
                .with_context(|| format!("executando {program}"))?;
            Ok(status)
        });

        let teardown = session.close();

        let status = match (outcome, teardown) {
            (Ok(status), Ok(())) => status,
            (Ok(_), Err(t)) => return Err(t).context("encerrando serviços"),
            (Err(e), Ok(())) => return Err(e),
            (Err(e), Err(t)) => {
                error!("  Falha ao encerrar serviços: {t}");
                return Err(e.context(format!("falha ao encerrar serviços: {t}")));
            }
        };

        if !status.success() {
            warn!("  Comando de teste retornou {status}");
        }
        Ok(status)
    }
}

/// Exit code of the CLI process for the test command's status
pub fn exit_code(status: ExitStatus) -> ExitCode {
    match status.code() {
        Some(0) => ExitCode::SUCCESS,
        Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        None => ExitCode::FAILURE,
    }
}

/// Starts every service, waits for each `SERVICE:PORT` and returns the
/// environment handed to the test command.
fn prepare(
    session: &mut Session,
    names: &[&str],
    services: &[ServicePort],
    checker: &dyn ReadinessCheck,
    options: WaitOptions,
) -> Result<Vec<(String, u16)>> {
    session.start(names)?;

    let mut env = Vec::with_capacity(services.len());
    for sp in services {
        let public = session.wait_for_service_with(&sp.service, sp.port, checker, options)?;
        env.push((sp.env_var(), public));
    }
    Ok(env)
}
