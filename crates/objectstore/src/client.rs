//! Object-Store Client Pool (C2).
//!
//! Grounded on `s3_util.py`/`superstore_utils.py`'s `write_to_s3`: a shared
//! client that PUTs a blob with server-side KMS encryption. The Python
//! client's connection multiplexing is reproduced here as a bounded
//! semaphore around the underlying `aws-sdk-s3` client (default 10
//! in-flight requests, spec §5), since the SDK's own HTTP connector pools
//! transparently but doesn't expose a request-concurrency knob.

use std::sync::Arc;
use std::time::Instant;

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tokio::sync::Semaphore;

use engine_core::error::{Error, Result};
use telemetry::metrics;

/// Shared, bounded-connection handle to blob storage.
pub struct ObjectStoreClient {
    client: Client,
    concurrency: Arc<Semaphore>,
}

impl ObjectStoreClient {
    pub async fn from_env(max_connections: usize) -> Self {
        let shared_config = aws_config::load_from_env().await;
        let client = Client::new(&shared_config);
        Self {
            client,
            concurrency: Arc::new(Semaphore::new(max_connections.max(1))),
        }
    }

    pub fn new(client: Client, max_connections: usize) -> Self {
        Self {
            client,
            concurrency: Arc::new(Semaphore::new(max_connections.max(1))),
        }
    }

    /// Uploads `body` to `{bucket}/{key}` with server-side KMS encryption
    /// (spec §4.8 step 5 / §6 object storage layout).
    pub async fn put_object_kms(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        kms_key_id: &str,
    ) -> Result<()> {
        let start = Instant::now();
        let _permit = self
            .concurrency
            .acquire()
            .await
            .map_err(|e| Error::object_store_upload(format!("semaphore closed: {e}")))?;

        let result = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .server_side_encryption(aws_sdk_s3::types::ServerSideEncryption::AwsKms)
            .ssekms_key_id(kms_key_id)
            .send()
            .await;

        metrics()
            .objectstore_latency_ms
            .observe(start.elapsed().as_millis() as u64);

        match result {
            Ok(_) => {
                metrics().objectstore_uploads.inc();
                Ok(())
            }
            Err(e) => {
                metrics().objectstore_upload_errors.inc();
                Err(Error::object_store_upload(format!(
                    "put_object {bucket}/{key} failed: {e}"
                )))
            }
        }
    }

    /// Fetches an object's full body, used to load the super-store allow-list
    /// config (spec §4.8 step 3).
    pub async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let _permit = self
            .concurrency
            .acquire()
            .await
            .map_err(|e| Error::object_store_upload(format!("semaphore closed: {e}")))?;

        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Error::object_store_upload(format!("get_object {bucket}/{key} failed: {e}")))?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| Error::object_store_upload(format!("read body {bucket}/{key} failed: {e}")))?;

        Ok(bytes.into_bytes().to_vec())
    }
}
