//! `classify`: print the page signature of a saved HTML file.

use std::path::Path;

use anyhow::Context;

/// Classify `file` and print its signature as pretty JSON.
///
/// Bytes that are not valid UTF-8 are replaced rather than rejected, since
/// saved snapshots are not always clean.
pub(crate) fn run_classify(file: &Path) -> anyhow::Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let html = String::from_utf8_lossy(&bytes);
    let signature = shelfscan_scraper::classify(&html);
    println!("{}", serde_json::to_string_pretty(&signature)?);
    Ok(())
}
