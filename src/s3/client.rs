use anyhow::Result;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, RequestChecksumCalculation};
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::{Client, primitives::ByteStream};
use futures::TryStreamExt;
use http_body::Frame;
use http_body_util::StreamBody;
use std::error::Error as StdError;
use tokio_util::io::ReaderStream;
use tracing::debug;

use super::store::{HeadStatus, LocalReadError, ObjectStore, UploadBody};
use crate::config::Config;

/// S3 client bound to the configured R2 (or S3-compatible) bucket
pub struct R2Client {
    client: Client,
    bucket: String,
}

impl R2Client {
    pub async fn new(config: &Config) -> Result<Self> {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "cfr2-env",
        );

        let endpoint = config.endpoint_url();
        debug!("Using endpoint {}", endpoint);

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .endpoint_url(&endpoint)
            .credentials_provider(credentials)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            // Streamed bodies go out as plain fixed-length PUTs, not aws-chunked
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .build();

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for R2Client {
    async fn head_object(&self, key: &str) -> Result<HeadStatus> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(_) => Ok(HeadStatus::Exists),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(HeadObjectError::is_not_found) =>
            {
                Ok(HeadStatus::NotFound)
            }
            Err(err) => Err(anyhow::Error::new(err)
                .context(format!("HeadObject s3://{}/{} failed", self.bucket, key))),
        }
    }

    async fn put_object(
        &self,
        key: &str,
        body: UploadBody,
        content_type: Option<&str>,
        content_length: u64,
    ) -> Result<()> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(streaming_body(body))
            .content_length(content_length as i64);

        if let Some(content_type) = content_type {
            request = request.content_type(content_type);
        }

        if let Err(err) = request.send().await {
            if let Some(local) = find_local_read_error(&err) {
                return Err(LocalReadError(local).into());
            }
            return Err(anyhow::Error::new(err)
                .context(format!("PutObject s3://{}/{} failed", self.bucket, key)));
        }

        Ok(())
    }
}

/// Request body that pulls from `body` as the SDK sends, chunk by chunk
fn streaming_body(body: UploadBody) -> ByteStream {
    let frames = ReaderStream::new(body)
        .map_ok(Frame::data)
        .map_err(LocalReadError);
    ByteStream::from_body_1_x(StreamBody::new(frames))
}

/// Body read failures come back wrapped in dispatch errors; dig the local one out
fn find_local_read_error(err: &(dyn StdError + 'static)) -> Option<std::io::Error> {
    std::iter::successors(Some(err), |e: &&(dyn StdError + 'static)| (*e).source())
        .find_map(|e| e.downcast_ref::<LocalReadError>())
        .map(|LocalReadError(io)| std::io::Error::new(io.kind(), io.to_string()))
}
