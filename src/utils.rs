//! Utility functions for file moves and external tool execution

use crate::error::{Result, StageError};
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Maximum number of stderr lines kept when reporting a tool failure
const STDERR_TAIL_LINES: usize = 5;

/// Move a file, falling back to copy + remove when a rename is not possible
///
/// A plain rename fails when source and destination are on different
/// filesystems (e.g. a tmpfs work root and a disk-backed public root); in that
/// case the file is copied and the source removed, so the source never
/// survives a successful move.
///
/// # Errors
///
/// Returns [`StageError::MoveFailed`] when both the rename and the copy fail,
/// or when the source cannot be removed after copying.
pub async fn move_file(source: &Path, dest: &Path) -> Result<()> {
    let rename_err = match tokio::fs::rename(source, dest).await {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };

    tracing::debug!(
        ?source,
        ?dest,
        error = %rename_err,
        "rename failed, falling back to copy"
    );

    let move_failed = |reason: String| StageError::MoveFailed {
        source_path: source.to_path_buf(),
        dest_path: dest.to_path_buf(),
        reason,
    };

    tokio::fs::copy(source, dest)
        .await
        .map_err(|e| move_failed(format!("rename: {rename_err}; copy: {e}")))?;
    tokio::fs::remove_file(source)
        .await
        .map_err(|e| move_failed(format!("copied but could not remove source: {e}")))?;

    Ok(())
}

/// Find the first file in `dir` whose extension matches one of `extensions`
///
/// Matching is case-insensitive and candidates are compared by file name so
/// the choice does not depend on directory iteration order.
pub async fn first_file_with_extension(
    dir: &Path,
    extensions: &[&str],
) -> std::io::Result<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut best: Option<PathBuf> = None;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)));
        if !matches || !entry.file_type().await?.is_file() {
            continue;
        }
        if best.as_ref().is_none_or(|b| path.file_name() < b.file_name()) {
            best = Some(path);
        }
    }

    Ok(best)
}

/// Why an external tool produced no output
#[derive(Debug)]
pub(crate) enum ToolRunError {
    /// The process could not be started
    Spawn(std::io::Error),
    /// The process ran longer than allowed and was killed
    TimedOut(Duration),
}

/// Run a command to completion, killing it if `timeout` elapses first
pub(crate) async fn run_tool(
    mut command: Command,
    timeout: Option<Duration>,
) -> std::result::Result<Output, ToolRunError> {
    command.kill_on_drop(true);
    let output = command.output();

    match timeout {
        Some(limit) => match tokio::time::timeout(limit, output).await {
            Ok(result) => result.map_err(ToolRunError::Spawn),
            Err(_) => Err(ToolRunError::TimedOut(limit)),
        },
        None => output.await.map_err(ToolRunError::Spawn),
    }
}

/// Last few non-empty stderr lines of a failed tool, or its exit status
pub(crate) fn stderr_tail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return format!("exited with {}", output.status);
    }
    lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n")
}
