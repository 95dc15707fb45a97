use bytes::Bytes;

/// Errors surfaced by an object store adapter.
///
/// The fan-out uploader keys its skip-vs-abort decisions off these variants:
/// a missing local file and missing/rejected credentials are skippable per
/// target, everything else is fatal during enumeration and aggregated during
/// uploads.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("credentials not available or rejected")]
    Unauthorized,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("backend error: HTTP {status} - {message}")]
    Backend { status: u16, message: String },
}

/// Trait implemented by object store adapters.
///
/// The adapter handles raw I/O against a single bucket: writing objects and
/// listing immediate child folder prefixes. Prefix discovery, fan-out
/// scheduling, and failure aggregation live above this seam, so tests can
/// substitute an in-memory store.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write an object at the given key with the given content type.
    async fn put_object(&self, key: &str, data: Bytes, content_type: &str)
        -> Result<(), StoreError>;

    /// List the immediate child folder prefixes of `prefix` (delimiter `/`).
    ///
    /// Pagination is handled inside the adapter; the returned vec covers all
    /// pages in listing order.
    async fn list_prefixes(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

/// Compute the destination key for a file under a folder prefix.
/// Scheme: `{prefix}{filename}`, where discovered prefixes already carry
/// their trailing delimiter and the bucket root is the empty string.
pub fn join_key(prefix: &str, filename: &str) -> String {
    if prefix.is_empty() || prefix.ends_with('/') {
        format!("{}{}", prefix, filename)
    } else {
        format!("{}/{}", prefix, filename)
    }
}

/// The portion of a path after the last `/`, or the whole input if it
/// contains none.
pub fn file_basename(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_key() {
        assert_eq!(join_key("", "index.html"), "index.html");
        assert_eq!(join_key("a/", "index.html"), "a/index.html");
        assert_eq!(join_key("a/b/", "report.html"), "a/b/report.html");
        assert_eq!(join_key("a/b", "report.html"), "a/b/report.html");
    }

    #[test]
    fn test_file_basename() {
        assert_eq!(file_basename("index.html"), "index.html");
        assert_eq!(file_basename("dist/site/index.html"), "index.html");
        assert_eq!(file_basename("/tmp/report.html"), "report.html");
        assert_eq!(file_basename("trailing/"), "");
    }
}
