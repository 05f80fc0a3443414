use crate::domain::{
    ComposeSpec, ComposeTool, DEFAULT_COMPOSE_COMMAND, ProjectName, WaitOptions,
};
use crate::error::FixtureError;
use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_CONFIG_FILE_NAME: &str = "compose-fixture.toml";
pub const DEFAULT_COMPOSE_FILE: &str = "tests/docker-compose.yml";
pub const DEFAULT_DOCKER_IP: &str = "127.0.0.1";
pub const DOCKER_HOST_ENV: &str = "DOCKER_HOST";

static DOCKER_HOST_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^tcp://(.+?):\d+$").expect("static regex"));

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
pub struct WaitConfig {
    pub timeout_secs: Option<f64>,
    pub poll_interval_ms: Option<u64>,
}

/// Contents of `compose-fixture.toml`. Every key is optional.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
pub struct FileConfig {
    pub compose_files: Option<Vec<PathBuf>>,
    pub project_name: Option<String>,
    pub compose_command: Option<String>,
    pub project_directory: Option<PathBuf>,
    pub keep_alive: Option<bool>,
    #[serde(default)]
    pub wait: WaitConfig,
}

impl FileConfig {
    /// Values present in `other` replace the ones in `self`.
    pub fn merge(&mut self, other: FileConfig) {
        if let Some(files) = other.compose_files {
            self.compose_files = Some(files);
        }
        if let Some(name) = other.project_name {
            self.project_name = Some(name);
        }
        if let Some(cmd) = other.compose_command {
            self.compose_command = Some(cmd);
        }
        if let Some(dir) = other.project_directory {
            self.project_directory = Some(dir);
        }
        if let Some(keep) = other.keep_alive {
            self.keep_alive = Some(keep);
        }
        if let Some(timeout) = other.wait.timeout_secs {
            self.wait.timeout_secs = Some(timeout);
        }
        if let Some(interval) = other.wait.poll_interval_ms {
            self.wait.poll_interval_ms = Some(interval);
        }
    }
}

/// Everything needed to build a session's registry.
#[derive(Debug, Clone)]
pub struct FixtureConfig {
    pub root: PathBuf,
    pub compose: ComposeSpec,
    pub docker_ip: String,
    pub keep_alive: bool,
    pub wait: WaitOptions,
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(DEFAULT_CONFIG_FILE_NAME)
}

/// Reads `compose-fixture.toml` from `root`, or defaults when absent
pub fn load_file_config(root: &Path) -> Result<FileConfig> {
    let path = config_path(root);
    if !path.exists() {
        debug!("sem {:?}, usando padrões", path);
        return Ok(FileConfig::default());
    }

    let content = fs::read_to_string(&path).with_context(|| format!("lendo {:?}", path))?;
    let config: FileConfig =
        toml::from_str(&content).with_context(|| format!("parse de {:?}", path))?;

    Ok(config)
}

/// Loads the file config under `root`, applies `overrides` and reads
/// `DOCKER_HOST` from the environment.
pub fn load(root: &Path, overrides: FileConfig) -> Result<FixtureConfig> {
    let mut file = load_file_config(root)?;
    file.merge(overrides);

    let docker_host = std::env::var(DOCKER_HOST_ENV).ok();
    let config = resolve(root, file, docker_host.as_deref())?;

    info!(
        "  Projeto {} com {} arquivo(s) compose",
        config.compose.project_name,
        config.compose.files.len()
    );

    Ok(config)
}

/// Turns a raw [`FileConfig`] into a [`FixtureConfig`], filling in defaults.
///
/// A relative `root` is made absolute against the current directory first,
/// so the default project name always reflects the real location.
pub fn resolve(root: &Path, file: FileConfig, docker_host: Option<&str>) -> Result<FixtureConfig> {
    let root = &std::path::absolute(root)
        .with_context(|| format!("resolvendo caminho absoluto de {:?}", root))?;
    let docker_ip = resolve_docker_ip(docker_host)?;

    let files = match file.compose_files {
        Some(files) if !files.is_empty() => files
            .iter()
            .map(|f| resolve_path(root, f))
            .collect::<Vec<_>>(),
        Some(_) => {
            return Err(FixtureError::Configuration("compose_files is empty".to_string()).into());
        }
        None => vec![root.join(DEFAULT_COMPOSE_FILE)],
    };

    let project_name = match file.project_name.as_deref() {
        Some(raw) => ProjectName::sanitize(raw),
        None => ProjectName::for_root(root),
    };
    if project_name.as_str().trim_matches('-').is_empty() {
        return Err(FixtureError::Configuration(format!(
            "project name {:?} has no usable characters",
            file.project_name.unwrap_or_default()
        ))
        .into());
    }

    let command = file
        .compose_command
        .as_deref()
        .unwrap_or(DEFAULT_COMPOSE_COMMAND);
    let tool = ComposeTool::parse(command).ok_or_else(|| {
        FixtureError::Configuration("compose_command must not be blank".to_string())
    })?;

    let mut compose = ComposeSpec::new(files, project_name).with_tool(tool);
    if let Some(dir) = &file.project_directory {
        compose = compose.with_project_directory(resolve_path(root, dir));
    }

    Ok(FixtureConfig {
        root: root.to_path_buf(),
        compose,
        docker_ip,
        keep_alive: file.keep_alive.unwrap_or(false),
        wait: wait_options(&file.wait)?,
    })
}

/// IP address used to reach published container ports.
///
/// No `DOCKER_HOST` (or a blank one) means the daemon is local and ports
/// are bound on loopback. Otherwise it must look like `tcp://<host>:<port>`.
pub fn resolve_docker_ip(docker_host: Option<&str>) -> crate::Result<String> {
    let docker_host = docker_host.map(str::trim).unwrap_or_default();
    if docker_host.is_empty() {
        return Ok(DEFAULT_DOCKER_IP.to_string());
    }

    DOCKER_HOST_PATTERN
        .captures(docker_host)
        .and_then(|caps| caps.get(1))
        .map(|host| host.as_str().to_string())
        .ok_or_else(|| {
            FixtureError::Configuration(format!(
                "invalid value for {DOCKER_HOST_ENV}: {docker_host:?}"
            ))
        })
}

fn wait_options(wait: &WaitConfig) -> Result<WaitOptions> {
    let mut options = WaitOptions::default();

    if let Some(secs) = wait.timeout_secs {
        options.timeout = Duration::try_from_secs_f64(secs).map_err(|_| {
            FixtureError::Configuration(format!("wait.timeout_secs must be >= 0, got {secs}"))
        })?;
    }
    if let Some(ms) = wait.poll_interval_ms {
        options.poll_interval = Duration::from_millis(ms);
    }

    Ok(options)
}

fn resolve_path(root: &Path, path: &Path) -> PathBuf {
    let expanded = PathBuf::from(shellexpand::tilde(path.to_string_lossy().as_ref()).into_owned());
    if expanded.is_absolute() {
        expanded
    } else {
        root.join(expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docker_ip_defaults_to_loopback() {
        assert_eq!(resolve_docker_ip(None).unwrap(), "127.0.0.1");
        assert_eq!(resolve_docker_ip(Some("  ")).unwrap(), "127.0.0.1");
    }

    #[test]
    fn docker_ip_from_tcp_host() {
        assert_eq!(
            resolve_docker_ip(Some("tcp://192.168.99.100:2376")).unwrap(),
            "192.168.99.100"
        );
        assert_eq!(
            resolve_docker_ip(Some("tcp://docker.internal:2375")).unwrap(),
            "docker.internal"
        );
    }

    #[test]
    fn docker_ip_rejects_other_schemes() {
        for bad in ["unix:///var/run/docker.sock", "tcp://host", "192.168.0.1:2375"] {
            let err = resolve_docker_ip(Some(bad)).unwrap_err();
            assert!(matches!(err, FixtureError::Configuration(_)), "{bad}");
        }
    }

    #[test]
    fn defaults_follow_root() {
        let root = Path::new("/work/My App");
        let config = resolve(root, FileConfig::default(), None).unwrap();

        assert_eq!(
            config.compose.files,
            vec![PathBuf::from("/work/My App/tests/docker-compose.yml")]
        );
        assert_eq!(config.compose.project_name.as_str(), "fixture-work-my-app");
        assert_eq!(config.compose.tool, ComposeTool::default());
        assert!(config.compose.project_directory.is_none());
        assert_eq!(config.docker_ip, "127.0.0.1");
        assert!(!config.keep_alive);
        assert_eq!(config.wait, WaitOptions::default());
    }

    #[test]
    fn relative_root_is_made_absolute() {
        let cwd = std::env::current_dir().unwrap();

        for relative in [".", "./"] {
            let config = resolve(Path::new(relative), FileConfig::default(), None).unwrap();
            let name = config.compose.project_name.as_str();

            assert!(config.root.is_absolute());
            assert!(name.len() > "fixture-".len(), "{relative}: {name}");
            assert!(config.compose.files[0].starts_with(&cwd));
        }

        let nested = resolve(Path::new("tests"), FileConfig::default(), None).unwrap();
        assert_eq!(nested.root, cwd.join("tests"));
    }

    #[test]
    fn parses_full_file() {
        let toml = r#"
compose_files = ["docker/base.yml", "/abs/override.yml"]
project_name = "Lovely Tests"
compose_command = "docker-compose"
project_directory = "docker"
keep_alive = true

[wait]
timeout_secs = 2.5
poll_interval_ms = 50
"#;
        let file: FileConfig = toml::from_str(toml).unwrap();
        let config = resolve(Path::new("/repo"), file, Some("tcp://10.0.0.5:2375")).unwrap();

        assert_eq!(
            config.compose.files,
            vec![
                PathBuf::from("/repo/docker/base.yml"),
                PathBuf::from("/abs/override.yml")
            ]
        );
        assert_eq!(config.compose.project_name.as_str(), "lovely-tests");
        assert_eq!(config.compose.tool.program, "docker-compose");
        assert_eq!(
            config.compose.project_directory,
            Some(PathBuf::from("/repo/docker"))
        );
        assert_eq!(config.docker_ip, "10.0.0.5");
        assert!(config.keep_alive);
        assert_eq!(config.wait.timeout, Duration::from_millis(2500));
        assert_eq!(config.wait.poll_interval, Duration::from_millis(50));
    }

    #[test]
    fn merge_prefers_overrides() {
        let mut base = FileConfig {
            project_name: Some("base".into()),
            keep_alive: Some(false),
            ..Default::default()
        };
        base.merge(FileConfig {
            keep_alive: Some(true),
            compose_files: Some(vec![PathBuf::from("x.yml")]),
            ..Default::default()
        });

        assert_eq!(base.project_name.as_deref(), Some("base"));
        assert_eq!(base.keep_alive, Some(true));
        assert_eq!(base.compose_files, Some(vec![PathBuf::from("x.yml")]));
    }

    #[test]
    fn rejects_invalid_values() {
        let empty_files = FileConfig {
            compose_files: Some(vec![]),
            ..Default::default()
        };
        assert!(resolve(Path::new("/r"), empty_files, None).is_err());

        let blank_tool = FileConfig {
            compose_command: Some("  ".into()),
            ..Default::default()
        };
        assert!(resolve(Path::new("/r"), blank_tool, None).is_err());

        let bad_name = FileConfig {
            project_name: Some("///".into()),
            ..Default::default()
        };
        assert!(resolve(Path::new("/r"), bad_name, None).is_err());

        let negative = FileConfig {
            wait: WaitConfig {
                timeout_secs: Some(-1.0),
                poll_interval_ms: None,
            },
            ..Default::default()
        };
        assert!(resolve(Path::new("/r"), negative, None).is_err());

        let bad_host = resolve(Path::new("/r"), FileConfig::default(), Some("ssh://x"));
        assert!(bad_host.is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_file_config(dir.path()).unwrap(), FileConfig::default());
    }

    #[test]
    fn reads_file_from_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(config_path(dir.path()), "project_name = \"from-file\"\n").unwrap();

        let file = load_file_config(dir.path()).unwrap();
        assert_eq!(file.project_name.as_deref(), Some("from-file"));
    }

    #[test]
    fn malformed_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(config_path(dir.path()), "compose_files = 3\n").unwrap();

        let err = load_file_config(dir.path()).unwrap_err();
        assert!(err.to_string().contains("parse de"));
    }
}
