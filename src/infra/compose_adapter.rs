use crate::domain::{CommandRunner, ComposeSpec};
use crate::error::Result;
use std::sync::Arc;

/// Builds compose invocations for one project and runs them through a
/// [`CommandRunner`].
#[derive(Debug, Clone)]
pub struct ComposeExecutor {
    spec: ComposeSpec,
    runner: Arc<dyn CommandRunner>,
}

impl ComposeExecutor {
    pub fn new(spec: ComposeSpec, runner: Arc<dyn CommandRunner>) -> Self {
        Self { spec, runner }
    }

    pub fn spec(&self) -> &ComposeSpec {
        &self.spec
    }

    /// Full argv for `subcommand`: tool, `-f <file>` per file in order,
    /// `-p <project>`, then the subcommand parts.
    pub fn command_line<I, S>(&self, subcommand: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let spec = &self.spec;
        let mut args: Vec<String> = Vec::with_capacity(4 + spec.files.len() * 2);
        args.push(spec.tool.program.clone());
        args.extend(spec.tool.args.iter().cloned());

        if let Some(dir) = &spec.project_directory {
            args.push("--project-directory".into());
            args.push(dir.to_string_lossy().into_owned());
        }

        for file in &spec.files {
            args.push("-f".into());
            args.push(file.to_string_lossy().into_owned());
        }

        args.push("-p".into());
        args.push(spec.project_name.as_str().into());

        args.extend(subcommand.into_iter().map(|part| part.as_ref().to_string()));
        args
    }

    pub fn execute<I, S>(&self, subcommand: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.runner.execute(&self.command_line(subcommand), &[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ComposeTool, ProjectName};
    use crate::test_support::MockRunner;
    use std::path::PathBuf;

    fn spec() -> ComposeSpec {
        ComposeSpec::new(
            vec![
                PathBuf::from("tests/docker-compose.yml"),
                PathBuf::from("tests/docker-compose.override.yml"),
            ],
            ProjectName::sanitize("demo"),
        )
    }

    #[test]
    fn prefix_keeps_file_order() {
        let executor = ComposeExecutor::new(spec(), Arc::new(MockRunner::new()));

        let argv = executor.command_line(["ps"]);
        assert_eq!(
            argv,
            vec![
                "docker",
                "compose",
                "-f",
                "tests/docker-compose.yml",
                "-f",
                "tests/docker-compose.override.yml",
                "-p",
                "demo",
                "ps",
            ]
        );
    }

    #[test]
    fn project_directory_follows_the_tool() {
        let spec = spec()
            .with_tool(ComposeTool::parse("docker-compose").unwrap())
            .with_project_directory("/srv/app");
        let executor = ComposeExecutor::new(spec, Arc::new(MockRunner::new()));

        let argv = executor.command_line(["down", "-v"]);
        assert_eq!(&argv[..3], ["docker-compose", "--project-directory", "/srv/app"]);
        assert_eq!(&argv[argv.len() - 2..], ["down", "-v"]);
    }

    #[test]
    fn execute_delegates_to_runner() {
        let mock = Arc::new(MockRunner::new());
        mock.respond_to("ps", "hello   running\n");
        let executor = ComposeExecutor::new(spec(), mock.clone());

        let out = executor.execute(["ps"]).unwrap();
        assert_eq!(out, "hello   running\n");
        assert_eq!(mock.get_subcommands(), vec!["ps".to_string()]);
    }
}
