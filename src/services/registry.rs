use crate::domain::{CommandRunner, ComposeSpec, ReadinessCheck, WaitOptions};
use crate::error::{FixtureError, Result};
use crate::infra::{ComposeExecutor, HttpChecker};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info};

/// Services of one compose project, as seen by a single test session.
///
/// Not meant to be shared between threads: parallel workers should each own
/// a registry with a distinct project name.
#[derive(Debug)]
pub struct ServiceRegistry {
    compose: ComposeExecutor,
    docker_ip: String,
    ports: HashMap<(String, u16), u16>,
    shut_down: bool,
}

impl ServiceRegistry {
    pub fn new(spec: ComposeSpec, docker_ip: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            compose: ComposeExecutor::new(spec, runner),
            docker_ip: docker_ip.into(),
            ports: HashMap::new(),
            shut_down: false,
        }
    }

    pub fn docker_ip(&self) -> &str {
        &self.docker_ip
    }

    pub fn compose(&self) -> &ComposeExecutor {
        &self.compose
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// `up --build -d` for the given services; already running ones are left alone
    pub fn start(&self, services: &[&str]) -> Result<()> {
        self.ensure_open()?;
        info!(" Iniciando {}...", services.join(", "));

        let mut args = vec!["up", "--build", "-d"];
        args.extend_from_slice(services);
        self.compose.execute(args)?;
        Ok(())
    }

    pub fn stop(&self, services: &[&str]) -> Result<()> {
        self.ensure_open()?;
        info!(" Parando {}...", services.join(", "));

        let mut args = vec!["stop"];
        args.extend_from_slice(services);
        self.compose.execute(args)?;
        Ok(())
    }

    /// Runs `command` inside the service container (`exec -T`) and returns its output
    pub fn exec(&self, service: &str, command: &[&str]) -> Result<String> {
        self.ensure_open()?;

        let mut args = vec!["exec", "-T", service];
        args.extend_from_slice(command);
        self.compose.execute(args)
    }

    /// Raw `ps` with extra arguments, e.g. `["--services", "--filter", "status=running"]`
    pub fn ps(&self, args: &[&str]) -> Result<String> {
        self.ensure_open()?;

        let mut full = vec!["ps"];
        full.extend_from_slice(args);
        self.compose.execute(full)
    }

    /// Names of the services compose currently reports as running
    pub fn running_services(&self) -> Result<Vec<String>> {
        let output = self.ps(&["--services", "--filter", "status=running"])?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Public host port bound to `private_port` of `service`.
    ///
    /// Resolved once through `compose port` and then served from the cache
    /// for the rest of the registry's life.
    pub fn port_for(&mut self, service: &str, private_port: u16) -> Result<u16> {
        self.ensure_open()?;

        let key = (service.to_string(), private_port);
        if let Some(port) = self.ports.get(&key) {
            return Ok(*port);
        }

        let output = self
            .compose
            .execute(["port", service, &private_port.to_string()])?;
        let public = parse_endpoint_port(service, private_port, &output)?;

        debug!("{service}:{private_port} publicado em {public}");
        self.ports.insert(key, public);
        Ok(public)
    }

    /// Waits until the default HTTP probe accepts the service and returns its public port
    pub fn wait_for_service(&mut self, service: &str, private_port: u16) -> Result<u16> {
        self.wait_for_service_with(
            service,
            private_port,
            &HttpChecker::new(),
            WaitOptions::default(),
        )
    }

    pub fn wait_for_service_with(
        &mut self,
        service: &str,
        private_port: u16,
        checker: &dyn ReadinessCheck,
        options: WaitOptions,
    ) -> Result<u16> {
        let public = self.port_for(service, private_port)?;
        let host = self.docker_ip.as_str();

        info!("ﱮ Aguardando {service} em {host}:{public}...");

        if poll_until(|| checker.is_ready(host, public), options) {
            info!(" {service} pronto");
            return Ok(public);
        }

        Err(FixtureError::ServiceTimeout {
            service: service.to_string(),
            port: private_port,
            timeout: options.timeout,
        })
    }

    /// `http://<docker ip>:<public port>` once the service answers HTTP
    pub fn url_for(&mut self, service: &str, private_port: u16) -> Result<String> {
        let public = self.wait_for_service(service, private_port)?;
        Ok(format!("http://{}:{public}", self.docker_ip))
    }

    /// `down -v`: removes containers and named volumes of the project.
    ///
    /// Safe when nothing was started. After the first successful call
    /// further calls are no-ops. A failing `down` is returned to the caller
    /// and leaves the registry open so teardown can be retried.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.shut_down {
            return Ok(());
        }

        info!(" Encerrando projeto {}...", self.compose.spec().project_name);
        self.compose.execute(["down", "-v"])?;
        self.shut_down = true;
        self.ports.clear();
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.shut_down {
            return Err(FixtureError::ShutDown);
        }
        Ok(())
    }
}

/// Calls `check` until it returns true or `options.timeout` has elapsed on a
/// monotonic clock. The first check happens immediately; the loop only
/// sleeps between failed checks.
pub fn poll_until<F>(mut check: F, options: WaitOptions) -> bool
where
    F: FnMut() -> bool,
{
    let started = Instant::now();

    while started.elapsed() < options.timeout {
        if check() {
            return true;
        }
        thread::sleep(options.poll_interval);
    }

    false
}

/// Extracts the port from compose's `host:port` answer. Only the first line
/// matters; the host part is usually `0.0.0.0` and is ignored.
fn parse_endpoint_port(service: &str, private_port: u16, output: &str) -> Result<u16> {
    let endpoint = output.lines().next().unwrap_or_default().trim();
    if endpoint.is_empty() || endpoint == ":0" {
        return Err(FixtureError::PortResolution {
            service: service.to_string(),
            port: private_port,
        });
    }

    endpoint
        .rsplit_once(':')
        .and_then(|(_, port)| port.parse::<u16>().ok())
        .filter(|port| *port > 0)
        .ok_or_else(|| FixtureError::InvalidEndpoint {
            service: service.to_string(),
            port: private_port,
            endpoint: endpoint.to_string(),
        })
}
