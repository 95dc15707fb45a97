//! S3-compatible store adapter.
//!
//! Works against AWS S3 and other S3-compatible APIs. Uses reqwest with
//! manual AWS Signature V4 signing so no SDK dependency is needed.

use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::{Digest, Sha256};
use tracing::debug;

use bucketindex_common::store::{ObjectStore, StoreError};

type HmacSha256 = Hmac<Sha256>;

const LIST_PAGE_SIZE: u32 = 1000;

#[derive(Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>, // Custom endpoint for S3-compatible stores
    pub access_key_id: String,
    pub secret_access_key: String,
}

pub struct S3Adapter {
    config: S3Config,
    client: Client,
}

impl S3Adapter {
    pub fn new(config: S3Config) -> Self {
        Self {
            config,
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(300))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    fn endpoint(&self) -> String {
        if let Some(ep) = &self.config.endpoint {
            ep.clone()
        } else {
            format!(
                "https://s3.{}.amazonaws.com/{}",
                self.config.region, self.config.bucket
            )
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/{}",
            self.endpoint().trim_end_matches('/'),
            urlencoding::encode(key)
        )
    }

    /// Missing credentials short-circuit to `Unauthorized` before any
    /// network call; there is nothing to sign with.
    fn check_credentials(&self) -> Result<(), StoreError> {
        if self.config.access_key_id.is_empty() || self.config.secret_access_key.is_empty() {
            return Err(StoreError::Unauthorized);
        }
        Ok(())
    }

    /// Compute AWS Signature V4 for a request.
    fn sign(
        &self,
        method: &str,
        path: &str,
        query: &str,
        headers: &BTreeMap<String, String>,
        body_hash: &str,
        date_time: &str,
        date: &str,
    ) -> String {
        // Canonical request
        let canonical_headers: String = headers
            .iter()
            .map(|(k, v)| format!("{}:{}\n", k, v.trim()))
            .collect();
        let signed_headers: String = headers.keys().cloned().collect::<Vec<_>>().join(";");

        let canonical_request = format!(
            "{}\n/{}\n{}\n{}\n{}\n{}",
            method, path, query, canonical_headers, signed_headers, body_hash
        );

        // String to sign
        let cr_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
        let credential_scope = format!("{}/{}/s3/aws4_request", date, self.config.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            date_time, credential_scope, cr_hash
        );

        // Signing key
        let signing_key = derive_signing_key(
            &self.config.secret_access_key,
            date,
            &self.config.region,
        );

        let mut mac = HmacSha256::new_from_slice(&signing_key).expect("HMAC key length ok");
        mac.update(string_to_sign.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        format!(
            "AWS4-HMAC-SHA256 Credential={}/{},SignedHeaders={},Signature={}",
            self.config.access_key_id, credential_scope, signed_headers, signature
        )
    }
}

fn derive_signing_key(secret: &str, date: &str, region: &str) -> Vec<u8> {
    let key = format!("AWS4{}", secret);
    let k_date = hmac_sha256(key.as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, b"s3");
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC key length ok");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn body_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Map a non-success response to the store error taxonomy.
async fn error_from_response(resp: reqwest::Response, key: &str) -> StoreError {
    let status = resp.status().as_u16();
    match status {
        401 | 403 => StoreError::Unauthorized,
        404 => StoreError::NotFound(key.to_string()),
        _ => {
            let message = resp.text().await.unwrap_or_default();
            StoreError::Backend { status, message }
        }
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3Adapter {
    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), StoreError> {
        self.check_credentials()?;

        let now = Utc::now();
        let date_time = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();

        let host = url_host(&self.endpoint());
        let body_hash_str = body_hash(&data);

        let mut headers = BTreeMap::new();
        headers.insert("content-length".to_string(), data.len().to_string());
        headers.insert("content-type".to_string(), content_type.to_string());
        headers.insert("host".to_string(), host);
        headers.insert("x-amz-content-sha256".to_string(), body_hash_str.clone());
        headers.insert("x-amz-date".to_string(), date_time.clone());

        let auth = self.sign("PUT", key, "", &headers, &body_hash_str, &date_time, &date);

        let url = self.object_url(key);
        let resp = self
            .client
            .put(&url)
            .header("Content-Type", content_type)
            .header("x-amz-date", &date_time)
            .header("x-amz-content-sha256", &body_hash_str)
            .header("Authorization", &auth)
            .body(data)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(error_from_response(resp, key).await);
        }

        debug!(key = %key, "S3 upload complete");
        Ok(())
    }

    async fn list_prefixes(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.check_credentials()?;

        let mut prefixes = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut params = vec![
                ("delimiter".to_string(), "%2F".to_string()),
                ("list-type".to_string(), "2".to_string()),
                ("max-keys".to_string(), LIST_PAGE_SIZE.to_string()),
                ("prefix".to_string(), urlencoding::encode(prefix).into_owned()),
            ];
            if let Some(token) = &continuation {
                params.push((
                    "continuation-token".to_string(),
                    urlencoding::encode(token).into_owned(),
                ));
            }
            // SigV4 requires query parameters in sorted order
            params.sort();
            let query = params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");

            let now = Utc::now();
            let date_time = now.format("%Y%m%dT%H%M%SZ").to_string();
            let date = now.format("%Y%m%d").to_string();

            let host = url_host(&self.endpoint());
            let empty_hash = body_hash(b"");

            let mut headers = BTreeMap::new();
            headers.insert("host".to_string(), host);
            headers.insert("x-amz-content-sha256".to_string(), empty_hash.clone());
            headers.insert("x-amz-date".to_string(), date_time.clone());

            let auth = self.sign("GET", "", &query, &headers, &empty_hash, &date_time, &date);

            let url = format!("{}/?{}", self.endpoint().trim_end_matches('/'), query);
            let resp = self
                .client
                .get(&url)
                .header("x-amz-date", &date_time)
                .header("x-amz-content-sha256", &empty_hash)
                .header("Authorization", &auth)
                .send()
                .await?;

            if !resp.status().is_success() {
                return Err(error_from_response(resp, prefix).await);
            }

            let body = resp.text().await?;
            prefixes.extend(parse_common_prefixes(&body));

            match parse_continuation_token(&body) {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }

        debug!(prefix = %prefix, count = prefixes.len(), "S3 list complete");
        Ok(prefixes)
    }
}

/// Extract `<CommonPrefixes><Prefix>…</Prefix></CommonPrefixes>` values from
/// an S3 ListObjectsV2 XML response.
fn parse_common_prefixes(xml: &str) -> Vec<String> {
    let mut prefixes = Vec::new();
    let mut remaining = xml;
    while let Some(start) = remaining.find("<CommonPrefixes>") {
        remaining = &remaining[start + "<CommonPrefixes>".len()..];
        let Some(end) = remaining.find("</CommonPrefixes>") else {
            break;
        };
        if let Some(p) = extract_tag(&remaining[..end], "Prefix") {
            prefixes.push(p);
        }
        remaining = &remaining[end + "</CommonPrefixes>".len()..];
    }
    prefixes
}

/// Token for the next page, if the listing was truncated.
fn parse_continuation_token(xml: &str) -> Option<String> {
    extract_tag(xml, "NextContinuationToken").filter(|t| !t.is_empty())
}

fn extract_tag(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    Some(xml[start..end].to_string())
}

/// Extract the host part from a URL for use in signing.
fn url_host(url: &str) -> String {
    // Strip scheme and path, return just host[:port]
    let without_scheme = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    without_scheme.split('/').next().unwrap_or(without_scheme).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_common_prefixes() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult>
  <Contents><Key>release/notes.txt</Key></Contents>
  <CommonPrefixes><Prefix>release/2024/</Prefix></CommonPrefixes>
  <CommonPrefixes><Prefix>release/2025/</Prefix></CommonPrefixes>
</ListBucketResult>"#;
        let prefixes = parse_common_prefixes(xml);
        assert_eq!(prefixes, vec!["release/2024/", "release/2025/"]);
    }

    #[test]
    fn test_parse_common_prefixes_none() {
        let xml = r#"<ListBucketResult>
  <Contents><Key>only-objects.txt</Key></Contents>
</ListBucketResult>"#;
        assert!(parse_common_prefixes(xml).is_empty());
    }

    #[test]
    fn test_parse_continuation_token() {
        let truncated = r#"<ListBucketResult>
  <IsTruncated>true</IsTruncated>
  <NextContinuationToken>1ueGcxLPRx1Tr</NextContinuationToken>
  <CommonPrefixes><Prefix>a/</Prefix></CommonPrefixes>
</ListBucketResult>"#;
        assert_eq!(
            parse_continuation_token(truncated),
            Some("1ueGcxLPRx1Tr".to_string())
        );

        let last_page = r#"<ListBucketResult>
  <IsTruncated>false</IsTruncated>
  <CommonPrefixes><Prefix>b/</Prefix></CommonPrefixes>
</ListBucketResult>"#;
        assert_eq!(parse_continuation_token(last_page), None);
    }

    #[test]
    fn test_url_host() {
        assert_eq!(url_host("https://s3.us-east-1.amazonaws.com/bucket"), "s3.us-east-1.amazonaws.com");
        assert_eq!(url_host("http://localhost:9000"), "localhost:9000");
    }

    #[test]
    fn test_hmac_sha256() {
        // Sanity check: produce a full-length digest
        let result = hmac_sha256(b"secret", b"data");
        assert_eq!(result.len(), 32);
    }

    #[tokio::test]
    async fn test_missing_credentials_short_circuit() {
        let adapter = S3Adapter::new(S3Config {
            bucket: "example-bucket".to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key_id: String::new(),
            secret_access_key: String::new(),
        });
        let err = adapter
            .put_object("index.html", Bytes::from("x"), "text/html")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unauthorized));

        let err = adapter.list_prefixes("").await.unwrap_err();
        assert!(matches!(err, StoreError::Unauthorized));
    }
}
