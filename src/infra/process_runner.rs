use crate::domain::CommandRunner;
use crate::error::{FixtureError, Result};
use std::io::{self, Read};
use std::process::{Child, Command, Stdio};
use tracing::{debug, warn};

/// Runs commands as real subprocesses.
///
/// stdout and stderr are attached to the same pipe, so the captured text
/// keeps the order in which the child wrote it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ProcessRunner {
    fn execute(&self, command: &[String], success_codes: &[i32]) -> Result<String> {
        let line = display_command(command);
        let Some((program, args)) = command.split_first() else {
            return Err(FixtureError::Configuration("empty command".to_string()));
        };

        debug!("executando {line}");

        let (output, status) =
            run_merged(program, args).map_err(|source| FixtureError::Spawn {
                command: line.clone(),
                source,
            })?;

        let code = status.code();
        if code.is_some_and(|c| success_codes.contains(&c)) {
            return Ok(output);
        }

        warn!("{line} retornou {:?}", code);
        Err(FixtureError::CommandFailure {
            command: line,
            code,
            output,
        })
    }
}

fn run_merged(program: &str, args: &[String]) -> io::Result<(String, std::process::ExitStatus)> {
    let (mut reader, writer) = io::pipe()?;

    // The Command owns the parent's copies of the write end; dropping it
    // before reading lets read_to_end see EOF once the child exits.
    let mut child: Child = {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(writer.try_clone()?)
            .stderr(writer);
        cmd.spawn()?
    };

    let mut raw = Vec::new();
    let read = reader.read_to_end(&mut raw);
    let status = child.wait()?;
    read?;

    Ok((String::from_utf8_lossy(&raw).into_owned(), status))
}

fn display_command(command: &[String]) -> String {
    command.join(" ")
}
