pub mod s3;

use bucketindex_common::store::ObjectStore;

use crate::config::Settings;
use self::s3::{S3Adapter, S3Config};

/// Construct the store adapter for a bucket.
///
/// Credentials come from the standard AWS environment variables. They may be
/// absent; requests then fail with `StoreError::Unauthorized` at call time
/// rather than at construction, matching how the uploader classifies
/// credential failures per target.
pub fn from_settings(bucket: &str, settings: &Settings) -> Box<dyn ObjectStore> {
    Box::new(S3Adapter::new(S3Config {
        bucket: bucket.to_string(),
        region: settings.region.clone(),
        endpoint: settings.endpoint.clone(),
        access_key_id: std::env::var("AWS_ACCESS_KEY_ID").unwrap_or_default(),
        secret_access_key: std::env::var("AWS_SECRET_ACCESS_KEY").unwrap_or_default(),
    }))
}
