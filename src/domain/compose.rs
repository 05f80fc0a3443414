use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

static INVALID_PROJECT_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static regex"));

pub const DEFAULT_PROJECT_PREFIX: &str = "fixture";
pub const DEFAULT_COMPOSE_COMMAND: &str = "docker compose";

/// Namespace for one session's containers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectName(String);

impl ProjectName {
    /// Lowercases `raw` and collapses every run of characters outside
    /// `[a-z0-9]` into a single hyphen.
    pub fn sanitize(raw: &str) -> Self {
        let lower = raw.to_lowercase();
        Self(INVALID_PROJECT_CHARS.replace_all(&lower, "-").into_owned())
    }

    /// Project name derived from the root directory of a test suite,
    /// e.g. `/home/dev/My App` becomes `fixture-home-dev-my-app`.
    pub fn for_root(root: &Path) -> Self {
        let slug = Self::sanitize(&root.to_string_lossy());
        let slug = slug.as_str();
        if slug.starts_with('-') {
            Self(format!("{DEFAULT_PROJECT_PREFIX}{slug}"))
        } else {
            Self(format!("{DEFAULT_PROJECT_PREFIX}-{slug}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The compose executable plus any fixed leading arguments
/// (`docker compose`, `docker-compose`, `podman-compose`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeTool {
    pub program: String,
    pub args: Vec<String>,
}

impl ComposeTool {
    /// Splits a command line on whitespace. Returns `None` for a blank string.
    pub fn parse(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

impl Default for ComposeTool {
    fn default() -> Self {
        Self {
            program: "docker".to_string(),
            args: vec!["compose".to_string()],
        }
    }
}

/// Immutable description of the compose project a registry drives.
#[derive(Debug, Clone)]
pub struct ComposeSpec {
    pub tool: ComposeTool,
    /// Later files override services of earlier ones, so order is kept as given.
    pub files: Vec<PathBuf>,
    pub project_name: ProjectName,
    pub project_directory: Option<PathBuf>,
}

impl ComposeSpec {
    pub fn new(files: Vec<PathBuf>, project_name: ProjectName) -> Self {
        Self {
            tool: ComposeTool::default(),
            files,
            project_name,
            project_directory: None,
        }
    }

    pub fn with_tool(mut self, tool: ComposeTool) -> Self {
        self.tool = tool;
        self
    }

    pub fn with_project_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_directory = Some(dir.into());
        self
    }
}

/// Timing of the readiness poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl WaitOptions {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(100),
        }
    }
}
