use crate::domain::CommandRunner;
use crate::error::Result;
use crate::infra::ProcessRunner;
use crate::infra::config::FixtureConfig;
use crate::services::ServiceRegistry;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::{error, info};

/// Session-scoped owner of a [`ServiceRegistry`].
///
/// Tears the compose project down when the session ends unless keep-alive
/// is set. Call [`Session::close`] to observe teardown failures; if the
/// session is only dropped, a failure is logged and otherwise ignored.
#[derive(Debug)]
pub struct Session {
    registry: ServiceRegistry,
    keep_alive: bool,
    closed: bool,
}

impl Session {
    pub fn new(registry: ServiceRegistry, keep_alive: bool) -> Self {
        Self {
            registry,
            keep_alive,
            closed: false,
        }
    }

    /// Session driving the real compose tool
    pub fn from_config(config: &FixtureConfig) -> Self {
        Self::with_runner(config, Arc::new(ProcessRunner::new()))
    }

    pub fn with_runner(config: &FixtureConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let registry = ServiceRegistry::new(config.compose.clone(), config.docker_ip.clone(), runner);
        Self::new(registry, config.keep_alive)
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ServiceRegistry {
        &mut self.registry
    }

    /// Ends the session, running `down -v` unless keep-alive is set.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.teardown()
    }

    fn teardown(&mut self) -> Result<()> {
        if self.keep_alive {
            info!(
                " Mantendo containers de {} ativos (keep-alive)",
                self.registry.compose().spec().project_name
            );
            return Ok(());
        }

        self.registry.shutdown()
    }
}

impl Deref for Session {
    type Target = ServiceRegistry;

    fn deref(&self) -> &Self::Target {
        &self.registry
    }
}

impl DerefMut for Session {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.registry
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.closed {
            return;
        }

        if let Err(e) = self.teardown() {
            error!("  Falha ao encerrar serviços: {e}");
        }
    }
}
