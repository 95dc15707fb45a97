//! Recursive folder-prefix discovery.
//!
//! Walks the bucket's simulated folder hierarchy via delimiter-based listing
//! and returns every reachable prefix in pre-order. Prefixes matching an
//! ignore pattern are pruned together with their entire subtree.

use bucketindex_common::store::{ObjectStore, StoreError};
use tracing::debug;

/// Discover all folder prefixes beneath `root`, pre-order, skipping any
/// prefix that contains one of the `ignore` patterns.
///
/// Any listing error propagates; there is no per-prefix recovery.
pub async fn enumerate(
    store: &dyn ObjectStore,
    root: &str,
    ignore: &[String],
) -> Result<Vec<String>, StoreError> {
    let mut folders = Vec::new();

    // Explicit work stack instead of recursion: bucket layouts can nest
    // arbitrarily deep. Children are pushed in reverse listing order so the
    // pop order matches a pre-order walk.
    let mut stack = keep_children(store.list_prefixes(root).await?, ignore);
    stack.reverse();

    while let Some(prefix) = stack.pop() {
        debug!(prefix = %prefix, "discovered folder");
        let mut children = keep_children(store.list_prefixes(&prefix).await?, ignore);
        folders.push(prefix);
        children.reverse();
        stack.extend(children);
    }

    Ok(folders)
}

fn keep_children(listed: Vec<String>, ignore: &[String]) -> Vec<String> {
    listed
        .into_iter()
        .filter(|p| p.ends_with('/'))
        .filter(|p| !ignore.iter().any(|pat| p.contains(pat.as_str())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use bytes::Bytes;

    struct MockStore {
        children: HashMap<String, Vec<String>>,
    }

    impl MockStore {
        fn with_tree(entries: &[(&str, &[&str])]) -> Self {
            let children = entries
                .iter()
                .map(|(parent, kids)| {
                    (
                        parent.to_string(),
                        kids.iter().map(|k| k.to_string()).collect(),
                    )
                })
                .collect();
            Self { children }
        }
    }

    #[async_trait::async_trait]
    impl ObjectStore for MockStore {
        async fn put_object(
            &self,
            _key: &str,
            _data: Bytes,
            _content_type: &str,
        ) -> Result<(), StoreError> {
            Ok(())
        }

        async fn list_prefixes(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
            Ok(self.children.get(prefix).cloned().unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn test_enumerate_preorder() {
        let store = MockStore::with_tree(&[
            ("", &["a/", "c/"]),
            ("a/", &["a/b/"]),
        ]);
        let folders = enumerate(&store, "", &[]).await.unwrap();
        assert_eq!(folders, vec!["a/", "a/b/", "c/"]);
    }

    #[tokio::test]
    async fn test_enumerate_empty_bucket() {
        let store = MockStore::with_tree(&[]);
        let folders = enumerate(&store, "", &[]).await.unwrap();
        assert!(folders.is_empty());
    }

    #[tokio::test]
    async fn test_ignore_prunes_subtree() {
        let store = MockStore::with_tree(&[
            ("", &[".svn/", "docs/"]),
            (".svn/", &[".svn/pristine/"]),
            ("docs/", &["docs/.svn/", "docs/api/"]),
        ]);
        let ignore = vec![".svn/".to_string()];
        let folders = enumerate(&store, "", &ignore).await.unwrap();
        assert_eq!(folders, vec!["docs/", "docs/api/"]);
    }

    #[tokio::test]
    async fn test_non_folder_keys_skipped() {
        let store = MockStore::with_tree(&[("", &["a/", "stray-key.txt"])]);
        let folders = enumerate(&store, "", &[]).await.unwrap();
        assert_eq!(folders, vec!["a/"]);
    }

    #[tokio::test]
    async fn test_enumerate_from_non_root() {
        let store = MockStore::with_tree(&[
            ("", &["a/", "c/"]),
            ("a/", &["a/b/"]),
        ]);
        let folders = enumerate(&store, "a/", &[]).await.unwrap();
        assert_eq!(folders, vec!["a/b/"]);
    }
}
