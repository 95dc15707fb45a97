//! Template materialization.
//!
//! The static site templates carry a placeholder assignment
//! `s3exp_config.Bucket = "<value>"`; rewriting injects the target bucket
//! name so the deployed index points at the bucket it lives in.

use std::path::Path;

use anyhow::Context;

/// Marker substring identifying the bucket assignment line.
pub const BUCKET_MARKER: &str = "s3exp_config.Bucket = ";

/// Rewrite `input` into `output`, replacing the bucket assignment value with
/// `bucket`. Every other line is carried byte-for-byte, including the first
/// and last. Missing input or a write failure is fatal.
pub fn rewrite(input: &Path, output: &Path, bucket: &str) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read template {}", input.display()))?;
    let rewritten = rewrite_content(&content, bucket);
    std::fs::write(output, rewritten)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(())
}

/// Replace the first quoted literal on each marker line with `bucket`.
/// Everything before the line's first quote is preserved; the rewritten line
/// always ends with a newline. Idempotent under re-application with the same
/// bucket name.
pub fn rewrite_content(content: &str, bucket: &str) -> String {
    let mut out = String::with_capacity(content.len());
    for line in content.split_inclusive('\n') {
        if line.contains(BUCKET_MARKER) {
            if let Some(quote) = line.find('"') {
                out.push_str(&line[..quote]);
                out.push('"');
                out.push_str(bucket);
                out.push_str("\"\n");
                continue;
            }
        }
        out.push_str(line);
    }
    out
}
