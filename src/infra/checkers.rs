use crate::domain::ReadinessCheck;
use reqwest::blocking::Client;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Default readiness probe: `GET http://host:port<path>`.
///
/// Any HTTP response with a status below 500 means the service is up, so a
/// 404 on `/` still counts. Connection refused, DNS errors and timeouts all
/// mean "not ready yet".
#[derive(Debug, Clone)]
pub struct HttpChecker {
    path: String,
    timeout: Duration,
    client: OnceLock<Option<Client>>,
}

impl HttpChecker {
    pub fn new() -> Self {
        Self::with_path("/")
    }

    /// Probe a specific path, e.g. `/probe_status`
    pub fn with_path(path: &str) -> Self {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };

        Self {
            path,
            timeout: DEFAULT_PROBE_TIMEOUT,
            client: OnceLock::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.client = OnceLock::new();
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn url(&self, host: &str, port: u16) -> String {
        if host.contains(':') && !host.starts_with('[') {
            format!("http://[{host}]:{port}{}", self.path)
        } else {
            format!("http://{host}:{port}{}", self.path)
        }
    }

    fn client(&self) -> Option<&Client> {
        self.client
            .get_or_init(|| {
                Client::builder()
                    .timeout(self.timeout)
                    .no_proxy()
                    .build()
                    .inspect_err(|e| warn!("falha ao criar cliente HTTP: {e}"))
                    .ok()
            })
            .as_ref()
    }
}

impl Default for HttpChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessCheck for HttpChecker {
    fn is_ready(&self, host: &str, port: u16) -> bool {
        let Some(client) = self.client() else {
            return false;
        };
        let url = self.url(host, port);

        match client.get(&url).send() {
            Ok(response) => is_ready_status(response.status().as_u16()),
            Err(e) => match e.status() {
                Some(status) => is_ready_status(status.as_u16()),
                None => {
                    debug!("{url} ainda indisponível: {e}");
                    false
                }
            },
        }
    }
}

fn is_ready_status(status: u16) -> bool {
    status < 500
}

/// Ready as soon as a TCP connection to `host:port` can be opened.
#[derive(Debug, Clone, Copy)]
pub struct TcpChecker {
    timeout: Duration,
}

impl TcpChecker {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TcpChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessCheck for TcpChecker {
    fn is_ready(&self, host: &str, port: u16) -> bool {
        let addrs = match (host, port).to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                debug!("não foi possível resolver {host}:{port}: {e}");
                return false;
            }
        };

        addrs
            .into_iter()
            .any(|addr| TcpStream::connect_timeout(&addr, self.timeout).is_ok())
    }
}
