use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::ObjectStore;
use tracing::info;

use geoingest_core::config::AwsConfig;

use crate::error::StorageError;

/// Build an S3 store for one bucket.
///
/// With an endpoint override (LocalStack, MinIO) requests are path-style and
/// plain HTTP is allowed when the endpoint says so.
pub fn build_s3_store(aws: &AwsConfig, bucket: &str) -> Result<Arc<dyn ObjectStore>, StorageError> {
    if bucket.is_empty() {
        return Err(StorageError::NotConfigured("empty bucket name".into()));
    }

    let mut builder = AmazonS3Builder::new()
        .with_region(&aws.region)
        .with_bucket_name(bucket);

    if let Some(ref key) = aws.access_key_id {
        builder = builder.with_access_key_id(key);
    }
    if let Some(ref secret) = aws.secret_access_key {
        builder = builder.with_secret_access_key(secret);
    }
    if let Some(ref token) = aws.session_token {
        builder = builder.with_token(token);
    }

    if let Some(endpoint) = aws.endpoint() {
        builder = builder
            .with_allow_http(endpoint.starts_with("http://"))
            .with_endpoint(endpoint);
    }

    let store = builder.build()?;

    info!(
        bucket,
        region = %aws.region,
        endpoint = aws.endpoint().as_deref().unwrap_or("(aws)"),
        "Storage: S3 store ready"
    );

    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_aws() -> AwsConfig {
        AwsConfig {
            region: "us-east-1".into(),
            access_key_id: Some("test".into()),
            secret_access_key: Some("test".into()),
            session_token: None,
            endpoint_url: Some("http://localstack:4566".into()),
        }
    }

    #[test]
    fn builds_store_for_local_endpoint() {
        let store = build_s3_store(&local_aws(), "geo").unwrap();
        assert!(store.to_string().contains("geo"));
    }

    #[test]
    fn rejects_empty_bucket() {
        assert!(matches!(
            build_s3_store(&local_aws(), ""),
            Err(StorageError::NotConfigured(_))
        ));
    }
}
