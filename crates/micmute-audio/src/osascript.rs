//! AppleScript runner for the system-wide input volume.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use micmute_core::{HardwareError, ScriptRunner};
use tracing::debug;

const OSASCRIPT: &str = "/usr/bin/osascript";

/// Runs AppleScript one-liners through `osascript -e`.
#[derive(Debug, Clone)]
pub struct Osascript {
    program: PathBuf,
}

impl Default for Osascript {
    fn default() -> Self {
        Self::with_program(OSASCRIPT)
    }
}

impl Osascript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a different interpreter binary.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, script: &str) -> Command {
        let mut command = Command::new(&self.program);
        command.arg("-e").arg(script).stderr(Stdio::null());
        command
    }

    fn launch_error(&self, error: std::io::Error) -> HardwareError {
        HardwareError::Script(format!("failed to launch {:?}: {error}", self.program))
    }
}

impl ScriptRunner for Osascript {
    fn output(&self, script: &str) -> Result<String, HardwareError> {
        let output = self.command(script).output().map_err(|e| self.launch_error(e))?;

        if !output.status.success() {
            return Err(HardwareError::Script(format!(
                "{:?} exited with {}",
                self.program, output.status
            )));
        }

        String::from_utf8(output.stdout).map_err(|e| HardwareError::Decode(e.to_string()))
    }

    fn spawn(&self, script: &str) -> Result<(), HardwareError> {
        let mut child = self
            .command(script)
            .stdout(Stdio::null())
            .spawn()
            .map_err(|e| self.launch_error(e))?;

        // reap in the background so the event thread never waits on it
        std::thread::spawn(move || match child.wait() {
            Ok(status) if !status.success() => debug!(%status, "osascript exited unsuccessfully"),
            Ok(_) => {}
            Err(e) => debug!(error = %e, "Failed to wait for osascript"),
        });
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_output_captures_stdout() {
        // echo stands in for osascript; it prints its arguments back
        let runner = Osascript::with_program("echo");
        let output = runner.output("42").unwrap();
        assert!(output.trim().ends_with("42"), "unexpected output: {output:?}");
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let runner = Osascript::with_program("/nonexistent/osascript");
        match runner.output("1") {
            Err(HardwareError::Script(message)) => {
                assert!(message.contains("/nonexistent/osascript"), "{message}")
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(runner.spawn("1"), Err(HardwareError::Script(_))));
    }

    #[test]
    fn test_failing_program_is_an_error() {
        let runner = Osascript::with_program("false");
        assert!(runner.output("1").is_err());
        assert!(runner.spawn("1").is_ok());
    }

    #[test]
    #[cfg(target_os = "macos")]
    #[ignore = "queries the live system settings"]
    fn test_read_system_volume() {
        let volume = Osascript::new()
            .output("input volume of (get volume settings)")
            .unwrap();
        assert!(volume.trim().parse::<u8>().is_ok());
    }
}
