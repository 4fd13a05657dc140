//! Word upload conversion through an external `pandoc` binary.

use std::io::Write;
use std::time::Duration;

use dealscout_shared::{DealScoutError, Result};
use tokio::process::Command;
use tracing::debug;

/// Ceiling on a single conversion.
const CONVERT_TIMEOUT: Duration = Duration::from_secs(60);

/// Convert `.docx` bytes to an HTML fragment so mail-links survive.
pub async fn docx_to_html(pandoc_cmd: &str, data: &[u8]) -> Result<String> {
    if data.is_empty() {
        return Err(DealScoutError::Conversion("cannot convert empty document".into()));
    }

    let mut tmpfile = tempfile::Builder::new()
        .suffix(".docx")
        .tempfile()
        .map_err(|e| DealScoutError::Conversion(format!("failed to create temp file: {e}")))?;
    tmpfile
        .write_all(data)
        .map_err(|e| DealScoutError::Conversion(format!("failed to write temp file: {e}")))?;

    debug!(pandoc_cmd, bytes = data.len(), "converting Word document");

    let mut cmd = Command::new(pandoc_cmd);
    cmd.arg("-f")
        .arg("docx")
        .arg("-t")
        .arg("html")
        .arg("--wrap=none")
        .arg(tmpfile.path())
        .kill_on_drop(true);

    let output = tokio::time::timeout(CONVERT_TIMEOUT, cmd.output())
        .await
        .map_err(|_| {
            DealScoutError::Conversion(format!(
                "{pandoc_cmd} timed out after {}s",
                CONVERT_TIMEOUT.as_secs()
            ))
        })?
        .map_err(|e| DealScoutError::Conversion(format!("failed to execute {pandoc_cmd}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DealScoutError::Conversion(format!(
            "{pandoc_cmd} failed ({}): {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
