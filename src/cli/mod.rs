pub mod commands;
pub mod session;

pub use commands::Fixture;
pub use session::ServicePort;

use crate::infra::config::{self, FileConfig};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "compose-fixture",
    version,
    about = "Starts compose services for a test suite, waits for them and tears them down"
)]
pub struct Cli {
    /// Keep docker containers alive after the session
    #[arg(
        long = "keepalive",
        short = 'K',
        global = true,
        env = "COMPOSE_FIXTURE_KEEPALIVE"
    )]
    pub keep_alive: bool,

    /// Root directory of the test suite (config file and default compose file live here)
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Compose file; repeat to layer overrides (replaces the configured list)
    #[arg(short = 'f', long = "file", global = true)]
    pub files: Vec<PathBuf>,

    /// Compose project name (sanitized to [a-z0-9-])
    #[arg(short = 'p', long, global = true)]
    pub project_name: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build and start services in the background
    Up {
        #[arg(required = true)]
        services: Vec<String>,
    },
    /// Stop services without removing them
    Stop {
        #[arg(required = true)]
        services: Vec<String>,
    },
    /// Run a command inside a service container
    Exec {
        service: String,
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Print the public port bound to a private port
    Port { service: String, port: u16 },
    /// Wait until a service accepts traffic and print its public port
    Wait {
        service: String,
        port: u16,
        /// HTTP path to probe
        #[arg(long, default_value = "/", conflicts_with = "tcp")]
        path: String,
        /// Probe with a plain TCP connect instead of HTTP
        #[arg(long)]
        tcp: bool,
        /// Seconds before giving up (default from config, else 30)
        #[arg(long)]
        timeout: Option<f64>,
        /// Milliseconds between probes (default from config, else 100)
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// Show compose status; extra arguments are passed through
    Ps {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Remove containers and volumes of the project
    Down,
    /// Start services, wait for them, run a test command, then tear down
    Run {
        /// SERVICE:PORT to start and wait for; repeatable
        #[arg(short = 's', long = "service", required = true)]
        services: Vec<ServicePort>,
        /// Probe with a plain TCP connect instead of HTTP
        #[arg(long)]
        tcp: bool,
        /// Test command and its arguments
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
}

impl Cli {
    /// Command-line values layered over `compose-fixture.toml`
    pub fn overrides(&self) -> FileConfig {
        FileConfig {
            compose_files: (!self.files.is_empty()).then(|| self.files.clone()),
            project_name: self.project_name.clone(),
            keep_alive: self.keep_alive.then_some(true),
            ..Default::default()
        }
    }
}

pub fn run(cli: Cli) -> Result<ExitCode> {
    let config = config::load(&cli.root, cli.overrides())?;
    let fixture = Fixture::new(config);
    fixture.execute(cli.command)
}
