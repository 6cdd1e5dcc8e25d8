//! Assist backend that runs an external program: prompt on stdin, SQL on stdout.

use log::debug;
use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;

use super::{SqlGenerator, build_prompt};
use crate::{Error, Result};

#[derive(Clone, Debug)]
pub struct CommandGenerator {
    program: Option<String>,
    args: Vec<String>,
    consent: bool,
}

impl CommandGenerator {
    /// `command` is program followed by arguments; empty means no backend is configured.
    pub fn new(command: &[String], consent: bool) -> Self {
        let mut parts = command.iter().cloned();
        Self {
            program: parts.next(),
            args: parts.collect(),
            consent,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.program.is_some()
    }
}

impl SqlGenerator for CommandGenerator {
    fn generate(&self, prompt: &str, schema_sql: &str) -> Result<String> {
        let Some(ref program) = self.program else {
            return Err(Error::AssistUnavailable(
                "no assist command configured".to_string(),
            ));
        };
        if !self.consent {
            return Err(Error::AssistPermission(
                "set consent = true under [assist] to send prompts and schema to the assist command"
                    .to_string(),
            ));
        }

        debug!("Running assist command {}", program);
        let mut child = Command::new(program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::AssistUnavailable(format!("{program}: {e}")))?;

        // Feed stdin from its own thread so a child that writes before it finishes
        // reading cannot fill the stdout pipe and stall both sides.
        let stdin = child.stdin.take();
        let text = build_prompt(prompt, schema_sql);
        let writer = thread::spawn(move || -> std::io::Result<()> {
            if let Some(mut stdin) = stdin {
                stdin.write_all(text.as_bytes())?;
            }
            Ok(())
        });
        let output = child.wait_with_output()?;
        let written = writer
            .join()
            .map_err(|_| Error::AssistUnavailable(format!("{program}: stdin writer panicked")))?;
        if !output.status.success() {
            return Err(Error::AssistUnavailable(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        if let Err(e) = written {
            // The child may exit successfully without reading its whole input.
            debug!("assist command stopped reading its prompt: {}", e);
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
