//! Z3 process backend
//!
//! Drives a long-lived `z3 -in -smt2` child process over stdin/stdout.
//! The session runs with `:print-success` on, so every command gets an
//! explicit acknowledgement and protocol drift is caught immediately.
//!
//! Check timeouts are layered: the solver's own `:timeout` option makes Z3
//! answer `unknown` at the budget, and an outer async timeout (with a grace
//! period) covers a solver that stops responding entirely. After an outer
//! timeout the process is out of protocol sync and the backend refuses
//! further commands.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::debug;

use crate::error::{SolverError, SolverResult};
use crate::model::SolverModel;
use crate::session::{SatResult, SolverBackend};

/// Extra time past the solver-side budget before declaring the process wedged
const TIMEOUT_GRACE: Duration = Duration::from_secs(1);

/// Z3 backend configuration
#[derive(Debug, Clone)]
pub struct Z3Config {
    /// Path to the z3 binary (auto-detected from PATH when `None`)
    pub z3_path: Option<PathBuf>,
    /// Memory limit in megabytes passed to the solver
    pub memory_limit_mb: Option<u64>,
}

impl Default for Z3Config {
    fn default() -> Self {
        Self {
            z3_path: None,
            memory_limit_mb: Some(4096),
        }
    }
}

impl Z3Config {
    /// Resolve the solver binary, consulting PATH if no path is configured
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::Unavailable`] when no binary can be found.
    pub fn locate(&self) -> SolverResult<PathBuf> {
        match &self.z3_path {
            Some(path) => Ok(path.clone()),
            None => which::which("z3")
                .map_err(|e| SolverError::Unavailable(format!("z3 not found in PATH: {e}"))),
        }
    }
}

/// A running Z3 process speaking SMT-LIB2 over pipes
pub struct Z3Process {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    wedged: bool,
}

impl Z3Process {
    /// Spawn with default configuration
    ///
    /// # Errors
    ///
    /// Same as [`Z3Process::spawn_with`].
    pub async fn spawn() -> SolverResult<Self> {
        Self::spawn_with(&Z3Config::default()).await
    }

    /// Spawn a solver process and complete the `:print-success` handshake
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::Unavailable`] when the binary is missing,
    /// [`SolverError::Io`] when spawning fails, and
    /// [`SolverError::Protocol`] when the handshake is not acknowledged.
    pub async fn spawn_with(config: &Z3Config) -> SolverResult<Self> {
        let binary = config.locate()?;
        let mut command = Command::new(&binary);
        command
            .arg("-in")
            .arg("-smt2")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(mb) = config.memory_limit_mb {
            command.arg(format!("-memory:{mb}"));
        }

        debug!(binary = %binary.display(), "spawning solver process");
        let mut child = command.spawn()?;
        let stdin = child.stdin.take().ok_or_else(|| {
            SolverError::Protocol("solver stdin not captured".to_string())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            SolverError::Protocol("solver stdout not captured".to_string())
        })?;

        let mut process = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            wedged: false,
        };
        process
            .command("(set-option :print-success true)")
            .await?;
        process.command("(set-option :produce-models true)").await?;
        Ok(process)
    }

    /// Send one command and require a `success` acknowledgement
    async fn command(&mut self, cmd: &str) -> SolverResult<()> {
        self.send(cmd).await?;
        let line = self.read_line().await?;
        if line == "success" {
            Ok(())
        } else {
            Err(SolverError::Protocol(format!(
                "expected success for {cmd}, got: {line}"
            )))
        }
    }

    async fn send(&mut self, cmd: &str) -> SolverResult<()> {
        if self.wedged {
            return Err(SolverError::Protocol(
                "solver process wedged after timeout".to_string(),
            ));
        }
        debug!(%cmd, "-> solver");
        self.stdin.write_all(cmd.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn read_line(&mut self) -> SolverResult<String> {
        let mut line = String::new();
        let n = self.stdout.read_line(&mut line).await?;
        if n == 0 {
            return Err(SolverError::Protocol(
                "solver process closed its output".to_string(),
            ));
        }
        let line = line.trim().to_string();
        debug!(%line, "<- solver");
        if line.starts_with("(error") {
            return Err(SolverError::Protocol(line));
        }
        Ok(line)
    }

    /// Read lines until the parentheses balance, skipping text inside
    /// string literals
    async fn read_balanced(&mut self) -> SolverResult<String> {
        let mut block = String::new();
        let mut depth = 0i64;
        let mut in_string = false;
        loop {
            let line = self.read_line().await?;
            for c in line.chars() {
                match c {
                    '"' => in_string = !in_string,
                    '(' if !in_string => depth += 1,
                    ')' if !in_string => depth -= 1,
                    _ => {}
                }
            }
            if !block.is_empty() {
                block.push('\n');
            }
            block.push_str(&line);
            if depth <= 0 && !in_string {
                return Ok(block);
            }
        }
    }

    /// Terminate the child process
    ///
    /// # Errors
    ///
    /// Propagates the kill failure, which normally means the process is
    /// already gone.
    pub async fn shutdown(mut self) -> SolverResult<()> {
        let _ = self.send("(exit)").await;
        self.child.kill().await?;
        Ok(())
    }
}

#[async_trait]
impl SolverBackend for Z3Process {
    async fn declare(&mut self, command: &str) -> SolverResult<()> {
        self.command(command).await
    }

    async fn assert(&mut self, term: &str) -> SolverResult<()> {
        self.command(&format!("(assert {term})")).await
    }

    async fn push(&mut self) -> SolverResult<()> {
        self.command("(push 1)").await
    }

    async fn pop(&mut self) -> SolverResult<()> {
        self.command("(pop 1)").await
    }

    async fn check_sat(&mut self, timeout: Duration) -> SolverResult<SatResult> {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.command(&format!("(set-option :timeout {millis})"))
            .await?;
        self.send("(check-sat)").await?;

        let budget = timeout + TIMEOUT_GRACE;
        let line = match tokio::time::timeout(budget, self.read_line()).await {
            Ok(result) => result?,
            Err(_) => {
                // The process no longer lines up with our reads; refuse
                // everything after this.
                self.wedged = true;
                debug!("solver exceeded its grace period, marking wedged");
                return Ok(SatResult::Unknown);
            }
        };
        match line.as_str() {
            "sat" => Ok(SatResult::Sat),
            "unsat" => Ok(SatResult::Unsat),
            "unknown" => Ok(SatResult::Unknown),
            other => Err(SolverError::Protocol(format!(
                "unexpected check-sat answer: {other}"
            ))),
        }
    }

    async fn get_model(&mut self) -> SolverResult<SolverModel> {
        self.send("(get-model)").await?;
        let block = self.read_balanced().await?;
        SolverModel::parse(&block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_detects_from_path() {
        let config = Z3Config::default();
        assert!(config.z3_path.is_none());
        assert_eq!(config.memory_limit_mb, Some(4096));
    }

    #[test]
    fn explicit_path_wins_over_detection() {
        let config = Z3Config {
            z3_path: Some(PathBuf::from("/opt/z3/bin/z3")),
            memory_limit_mb: None,
        };
        assert_eq!(config.locate().unwrap(), PathBuf::from("/opt/z3/bin/z3"));
    }

    #[tokio::test]
    async fn spawn_reports_unavailable_without_binary() {
        let config = Z3Config {
            z3_path: None,
            memory_limit_mb: None,
        };
        if which::which("z3").is_err() {
            assert!(matches!(
                Z3Process::spawn_with(&config).await,
                Err(SolverError::Unavailable(_))
            ));
        }
    }
}
