use crate::domain::CommandRunner;
use crate::error::{FixtureError, Result};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone)]
enum MockResponse {
    Output(String),
    Failure { code: i32, output: String },
}

/// Records every command instead of running it and replays canned output
/// keyed by the compose subcommand (everything after `-p <project>`).
#[derive(Debug, Default)]
pub struct MockRunner {
    commands: RwLock<Vec<Vec<String>>>,
    responses: RwLock<HashMap<String, MockResponse>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `subcommand` (e.g. `"port hello 80"`) with `output`
    pub fn respond_to(&self, subcommand: &str, output: &str) {
        self.responses.write().unwrap().insert(
            subcommand.to_string(),
            MockResponse::Output(output.to_string()),
        );
    }

    /// Make `subcommand` exit with `code`
    pub fn fail_on(&self, subcommand: &str, code: i32, output: &str) {
        self.responses.write().unwrap().insert(
            subcommand.to_string(),
            MockResponse::Failure {
                code,
                output: output.to_string(),
            },
        );
    }

    pub fn get_commands(&self) -> Vec<Vec<String>> {
        self.commands.read().unwrap().clone()
    }

    pub fn get_subcommands(&self) -> Vec<String> {
        self.commands
            .read()
            .unwrap()
            .iter()
            .map(|command| subcommand_of(command))
            .collect()
    }

    pub fn calls_to(&self, subcommand: &str) -> usize {
        self.get_subcommands()
            .iter()
            .filter(|recorded| recorded.as_str() == subcommand)
            .count()
    }
}

impl CommandRunner for MockRunner {
    fn execute(&self, command: &[String], success_codes: &[i32]) -> Result<String> {
        self.commands.write().unwrap().push(command.to_vec());

        let key = subcommand_of(command);
        let response = self.responses.read().unwrap().get(&key).cloned();

        match response {
            None => Ok(String::new()),
            Some(MockResponse::Output(output)) => Ok(output),
            Some(MockResponse::Failure { code, output }) if !success_codes.contains(&code) => {
                Err(FixtureError::CommandFailure {
                    command: command.join(" "),
                    code: Some(code),
                    output,
                })
            }
            Some(MockResponse::Failure { output, .. }) => Ok(output),
        }
    }
}

fn subcommand_of(command: &[String]) -> String {
    let start = command
        .iter()
        .position(|part| part == "-p")
        .map(|idx| idx + 2)
        .unwrap_or(0)
        .min(command.len());
    command[start..].join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn records_subcommands_after_project_flag() {
        let mock = MockRunner::new();
        mock.execute(&argv(&["docker", "compose", "-p", "x", "up", "-d"]), &[0])
            .unwrap();
        mock.execute(&argv(&["echo", "hi"]), &[0]).unwrap();

        assert_eq!(mock.get_subcommands(), vec!["up -d", "echo hi"]);
        assert_eq!(mock.calls_to("up -d"), 1);
    }

    #[test]
    fn failure_respects_success_codes() {
        let mock = MockRunner::new();
        mock.fail_on("false", 1, "nope");

        assert!(mock.execute(&argv(&["false"]), &[0]).is_err());
        assert_eq!(mock.execute(&argv(&["false"]), &[0, 1]).unwrap(), "nope");
    }
}
