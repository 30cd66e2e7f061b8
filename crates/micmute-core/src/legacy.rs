//! System-wide input volume, reached through a script runner.
//!
//! This channel is not tied to any device. It is the fallback for hardware
//! whose own controls are missing or ineffective.

use tracing::{debug, warn};

use crate::hardware::ScriptRunner;

const READ_SCRIPT: &str = "input volume of (get volume settings)";

/// Reads and writes the OS-wide input volume (0 to 100).
pub struct LegacySystemVolume<R> {
    runner: R,
}

impl<R: ScriptRunner> LegacySystemVolume<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Current input volume. Any failure, including unparseable output, reads
    /// as 0.
    pub fn read_volume(&self) -> u8 {
        match self.runner.output(READ_SCRIPT) {
            Ok(output) => parse_volume(&output),
            Err(e) => {
                warn!(error = %e, "Failed to read system input volume");
                0
            }
        }
    }

    /// Sets the input volume without waiting for the result.
    pub fn write_volume(&self, level: u8) {
        let level = level.min(100);
        debug!(level, "Writing system input volume");
        if let Err(e) = self.runner.spawn(&write_script(level)) {
            debug!(error = %e, "System input volume write failed");
        }
    }
}

fn write_script(level: u8) -> String {
    format!("set volume input volume {level}")
}

fn parse_volume(output: &str) -> u8 {
    output
        .trim()
        .parse::<i64>()
        .map(|v| v.clamp(0, 100) as u8)
        .unwrap_or(0)
}
