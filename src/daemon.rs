//! 后台运行、停止和状态检查（仅 Unix）

use anyhow::{bail, Context, Result};
use daemonize::Daemonize;
use std::fs::OpenOptions;
use std::path::Path;

/// Detaches the process, writes the PID file and redirects stdout/stderr to
/// `log_file`. Must run before the tokio runtime is created.
pub fn detach(pid_file: &Path, log_file: &Path) -> Result<()> {
    let open_log = || {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .with_context(|| format!("Failed to open log file {}", log_file.display()))
    };

    Daemonize::new()
        .pid_file(pid_file)
        .working_directory(std::env::current_dir()?)
        .stdout(open_log()?)
        .stderr(open_log()?)
        .umask(0o027)
        .start()
        .context("Failed to daemonize")?;

    Ok(())
}

fn read_pid(pid_file: &Path) -> Result<i32> {
    if !pid_file.exists() {
        bail!(
            "PID file not found: {} (daemon is not running or PID file was removed)",
            pid_file.display()
        );
    }

    let pid_str = std::fs::read_to_string(pid_file)?;
    pid_str
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid PID in file: {}", pid_str.trim()))
}

#[cfg(unix)]
pub fn stop(pid_file: &Path) -> Result<()> {
    use std::process::Command;

    let pid = read_pid(pid_file)?;
    let output = Command::new("kill").arg(pid.to_string()).output()?;
    std::fs::remove_file(pid_file)?;

    if !output.status.success() {
        bail!("Failed to stop daemon (PID: {}), process may have already exited", pid);
    }

    eprintln!("✓ Daemon stopped (PID: {})", pid);
    Ok(())
}

#[cfg(unix)]
pub fn status(pid_file: &Path) -> Result<()> {
    use std::process::Command;

    let pid = read_pid(pid_file)?;
    let output = Command::new("ps").arg("-p").arg(pid.to_string()).output()?;

    if !output.status.success() {
        bail!(
            "Daemon is not running, stale PID file found: {} (PID: {})",
            pid_file.display(),
            pid
        );
    }

    eprintln!("✓ Daemon is running (PID: {})", pid);
    eprintln!("  PID file: {}", pid_file.display());
    Ok(())
}

#[cfg(not(unix))]
pub fn stop(_pid_file: &Path) -> Result<()> {
    bail!("Daemon stop is only supported on Unix systems")
}

#[cfg(not(unix))]
pub fn status(_pid_file: &Path) -> Result<()> {
    bail!("Daemon status check is only supported on Unix systems")
}
