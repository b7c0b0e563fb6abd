// src/exec/command.rs

//! Shell command construction and child output plumbing shared by the
//! transformation units, linters, the test runner and the supervisor.

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info};

/// Build a shell command appropriate for the platform.
///
/// The child is killed when its handle is dropped.
pub fn shell_command(cmd: &str) -> Command {
    let mut c = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    };
    c.kill_on_drop(true);
    c
}

/// Like [`shell_command`], but passes `args` to the command as positional
/// arguments (`"$@"`) instead of splicing them into the command string.
pub fn shell_command_with_args<I, S>(cmd: &str, args: I) -> Command
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    if cfg!(windows) {
        let mut c = shell_command(cmd);
        c.args(args);
        return c;
    }

    let mut c = Command::new("sh");
    c.arg("-c")
        .arg(format!("{cmd} \"$@\""))
        .arg("sh")
        .args(args)
        .kill_on_drop(true);
    c
}

/// Consume the child's stdout/stderr so buffers don't fill, logging each line
/// under `source`.
///
/// Stdout lines are logged at `info`, stderr at `debug`.
pub fn forward_output(source: &str, child: &mut Child) {
    if let Some(stdout) = child.stdout.take() {
        let source = source.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(source = %source, "{}", line);
            }
        });
    }

    if let Some(stderr) = child.stderr.take() {
        let source = source.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(source = %source, "stderr: {}", line);
            }
        });
    }
}

/// Spawn `cmd`, forward its output to the log and wait for it to exit.
pub async fn run_to_completion(source: &str, mut cmd: Command) -> Result<ExitStatus> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for '{source}'"))?;
    forward_output(source, &mut child);

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for process of '{source}'"))?;

    debug!(source = %source, exit_code = status.code().unwrap_or(-1), "process exited");
    Ok(status)
}

/// Feed `input` to a shell command on stdin and collect its stdout.
///
/// `asset_path` is exported to the command as `ASSET_PATH`. A non-zero exit
/// is an error carrying the command's stderr.
pub async fn pipe_through(cmd: &str, asset_path: &Path, input: Vec<u8>) -> Result<Vec<u8>> {
    let mut child = shell_command(cmd)
        .env("ASSET_PATH", asset_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawning '{cmd}'"))?;

    let mut stdin = child.stdin.take().context("child stdin not captured")?;
    let mut stdout = child.stdout.take().context("child stdout not captured")?;
    let mut stderr = child.stderr.take().context("child stderr not captured")?;

    let writer = async move {
        stdin.write_all(&input).await?;
        stdin.shutdown().await
    };
    let reader = async move {
        let mut out = Vec::new();
        stdout.read_to_end(&mut out).await.map(|_| out)
    };
    let err_reader = async move {
        let mut err = String::new();
        stderr.read_to_string(&mut err).await.map(|_| err)
    };

    let (written, output, errors) = tokio::join!(writer, reader, err_reader);
    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for '{cmd}'"))?;

    let output = output.with_context(|| format!("reading output of '{cmd}'"))?;
    let errors = errors.unwrap_or_default();

    if !status.success() {
        bail!(
            "'{cmd}' exited with code {} on {}: {}",
            status.code().unwrap_or(-1),
            asset_path.display(),
            errors.trim()
        );
    }
    if let Err(err) = written {
        // The command finished without consuming all of its input.
        debug!(cmd = %cmd, error = %err, "stdin closed early");
    }

    Ok(output)
}
