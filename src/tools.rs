use anyhow::{Context, Result, anyhow};
use std::env;
use std::ffi::OsStr;
use std::fs;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Looks `cmd` up on PATH (or checks it directly when it is a path).
pub(crate) fn command_exists(cmd: &str) -> bool {
    let path = Path::new(cmd);
    if path.components().count() > 1 {
        return is_executable(path);
    }
    let Some(path_var) = env::var_os("PATH") else {
        return false;
    };
    env::split_paths(&path_var).any(|dir| {
        if is_executable(&dir.join(cmd)) {
            return true;
        }
        cfg!(windows) && is_executable(&dir.join(format!("{}.exe", cmd)))
    })
}

fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Runs an external tool to completion and returns its stdout.
pub(crate) fn run_tool<I, S>(program: &str, args: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command.args(args);
    debug!(program, "running external tool");
    let output = command
        .output()
        .with_context(|| format!("failed to run {} (is it installed?)", program))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("{} failed: {}", program, stderr.trim()));
    }
    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_command_is_not_found() {
        assert!(!command_exists("definitely-not-a-real-tool-4821"));
    }

    #[cfg(unix)]
    #[test]
    fn failing_tool_reports_stderr() {
        let err = run_tool("sh", ["-c", "echo broken >&2; exit 3"]).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[cfg(unix)]
    #[test]
    fn successful_tool_returns_stdout() {
        let out = run_tool("sh", ["-c", "printf ok"]).expect("stdout");
        assert_eq!(out, b"ok");
    }
}
