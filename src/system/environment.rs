//! Software environment and hostname lookup

use std::process::Command;
use std::sync::mpsc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{TelemetryError, TelemetryResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoftwareSnapshot {
    pub arch: String,
    pub os_name: String,
    pub runtime_name: String,
    pub runtime_version: String,
    pub runtime_spec_version: String,
}

/// Source of the one-time software description
pub trait EnvironmentInfo: Send + Sync {
    fn software_snapshot(&self) -> SoftwareSnapshot;

    /// Best-effort hostname. Errors are never fatal to the caller.
    fn hostname(&self) -> TelemetryResult<String>;
}

/// Describes the running process.
///
/// The hostname comes from `HOSTNAME` or `COMPUTERNAME`; failing that, the
/// lookup command (`hostname` unless replaced with [`with_command`]) runs on
/// a helper thread and is abandoned once `timeout` elapses.
///
/// [`with_command`]: ProcessEnvironment::with_command
pub struct ProcessEnvironment {
    timeout: Duration,
    program: String,
    args: Vec<String>,
}

impl ProcessEnvironment {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            program: "hostname".to_string(),
            args: Vec::new(),
        }
    }

    /// Replaces the command whose stdout is taken as the hostname
    pub fn with_command(mut self, program: impl Into<String>, args: &[&str]) -> Self {
        self.program = program.into();
        self.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    fn hostname_from_env() -> Option<String> {
        ["HOSTNAME", "COMPUTERNAME"]
            .iter()
            .filter_map(|key| std::env::var(key).ok())
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
    }

    fn hostname_from_command(&self) -> TelemetryResult<String> {
        let (tx, rx) = mpsc::channel();
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        std::thread::spawn(move || {
            let _ = tx.send(command.output());
        });

        let output = rx
            .recv_timeout(self.timeout)
            .map_err(|_| TelemetryError::HostnameUnavailable(format!("lookup exceeded {:?}", self.timeout)))?
            .map_err(|e| TelemetryError::HostnameUnavailable(e.to_string()))?;

        if !output.status.success() {
            return Err(TelemetryError::HostnameUnavailable(format!(
                "{} exited with {}",
                self.program, output.status
            )));
        }

        let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if name.is_empty() {
            Err(TelemetryError::HostnameUnavailable("empty hostname".to_string()))
        } else {
            Ok(name)
        }
    }
}

impl Default for ProcessEnvironment {
    fn default() -> Self {
        Self::new(Duration::from_millis(2000))
    }
}

impl EnvironmentInfo for ProcessEnvironment {
    fn software_snapshot(&self) -> SoftwareSnapshot {
        SoftwareSnapshot {
            arch: std::env::consts::ARCH.to_string(),
            os_name: std::env::consts::OS.to_string(),
            runtime_name: env!("CARGO_PKG_NAME").to_string(),
            runtime_version: env!("CARGO_PKG_VERSION").to_string(),
            runtime_spec_version: env!("CARGO_PKG_RUST_VERSION").to_string(),
        }
    }

    fn hostname(&self) -> TelemetryResult<String> {
        match Self::hostname_from_env() {
            Some(name) => Ok(name),
            None => self.hostname_from_command(),
        }
    }
}
