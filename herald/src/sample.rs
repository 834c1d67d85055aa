//! Sample input generation

use std::path::Path;

use anyhow::Context;

/// Default file name for `herald sample`.
pub const SAMPLE_FILE: &str = "sample_messages.csv";

pub const SAMPLE_CONTENT: &str = "\
Mobile,Message
919876543210,Hello! This is a test message from the WhatsApp Bulk Sender.
918765432109,Hi there! How are you doing today?
";

/// Write [`SAMPLE_CONTENT`] to `path` unless something already lives there.
///
/// Returns `false` when the file was left untouched.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_sample(path: &Path) -> anyhow::Result<bool> {
    if path.exists() {
        tracing::info!(path = %path.display(), "Sample file already exists, leaving it alone");
        return Ok(false);
    }

    std::fs::write(path, SAMPLE_CONTENT)
        .with_context(|| format!("Failed to write sample to {}", path.display()))?;
    tracing::info!(path = %path.display(), "Created sample file");

    Ok(true)
}
