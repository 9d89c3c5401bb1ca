use anyhow::{Context, Result};
use std::env;
use std::fmt;

/// Prefix shared by every environment variable the uploader reads
pub const ENV_PREFIX: &str = "CFR2";

const DEFAULT_REGION: &str = "auto";

/// Store credentials and target bucket, loaded once at startup
#[derive(Clone)]
pub struct Config {
    pub bucket: String,
    pub account_id: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    /// Overrides the endpoint derived from `account_id`
    pub endpoint: Option<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bucket", &self.bucket)
            .field("account_id", &self.account_id)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables and .env file
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is missing, empty or invalid
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if it exists

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bucket = require(&lookup, "BUCKET")?;
        Self::validate_bucket_name(&bucket)?;

        let account_id = require(&lookup, "ACCOUNT_ID")?;
        let access_key_id = require(&lookup, "ACCESSKEY")?;
        let secret_access_key = require(&lookup, "SECRETKEY")?;

        let region = optional(&lookup, "REGION").unwrap_or_else(|| DEFAULT_REGION.to_string());

        let endpoint = optional(&lookup, "ENDPOINT");
        if let Some(endpoint) = &endpoint {
            Self::validate_endpoint(endpoint)?;
        }

        Ok(Self {
            bucket,
            account_id,
            access_key_id,
            secret_access_key,
            region,
            endpoint,
        })
    }

    /// Endpoint URL of the store: the explicit override, or the account's R2 endpoint
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}.r2.cloudflarestorage.com", self.account_id),
        }
    }

    fn validate_endpoint(endpoint: &str) -> Result<()> {
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            anyhow::bail!(
                "{}_ENDPOINT '{}' must start with http:// or https://",
                ENV_PREFIX,
                endpoint
            );
        }

        Ok(())
    }

    /// Validate bucket name according to S3 naming rules
    fn validate_bucket_name(bucket: &str) -> Result<()> {
        if bucket.len() < 3 || bucket.len() > 63 {
            anyhow::bail!(
                "{}_BUCKET '{}' must be between 3 and 63 characters (got {})",
                ENV_PREFIX,
                bucket,
                bucket.len()
            );
        }

        let edge_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());

        if !edge_ok(bucket.chars().next()) {
            anyhow::bail!(
                "{}_BUCKET '{}' must start with a lowercase letter or number",
                ENV_PREFIX,
                bucket
            );
        }

        if !edge_ok(bucket.chars().last()) {
            anyhow::bail!(
                "{}_BUCKET '{}' must end with a lowercase letter or number",
                ENV_PREFIX,
                bucket
            );
        }

        if let Some(c) = bucket
            .chars()
            .find(|c| !c.is_ascii_lowercase() && !c.is_ascii_digit() && *c != '-' && *c != '.')
        {
            anyhow::bail!(
                "{}_BUCKET '{}' contains invalid character '{}'. Only lowercase letters, numbers, hyphens, and periods are allowed",
                ENV_PREFIX,
                bucket,
                c
            );
        }

        if bucket.contains("..") {
            anyhow::bail!(
                "{}_BUCKET '{}' cannot contain consecutive periods",
                ENV_PREFIX,
                bucket
            );
        }

        let parts: Vec<&str> = bucket.split('.').collect();
        if parts.len() == 4 && parts.iter().all(|part| part.parse::<u8>().is_ok()) {
            anyhow::bail!(
                "{}_BUCKET '{}' cannot be formatted as an IP address",
                ENV_PREFIX,
                bucket
            );
        }

        Ok(())
    }
}

fn require<F>(lookup: &F, name: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, name).with_context(|| {
        format!(
            "{}_{} not found in environment. Please set it in .env file",
            ENV_PREFIX, name
        )
    })
}

/// Empty values count as unset
fn optional<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(&format!("{}_{}", ENV_PREFIX, name))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
