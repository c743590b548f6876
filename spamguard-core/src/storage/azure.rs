//! Azure Blob Storage client over the REST API.
//!
//! Requests are authorized with Shared Key: an HMAC-SHA256 over the
//! canonical string-to-sign, keyed with the base64-decoded account key.
//! Only the two operations the service needs are implemented: Get Blob and
//! Put Blob (block blob, single request).

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, IF_NONE_MATCH};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use super::{BlobRef, BlobStore};
use crate::error::{Result, StorageError};

type HmacSha256 = Hmac<Sha256>;

/// REST API version sent with every request.
pub const API_VERSION: &str = "2021-08-06";

const BLOB_CONTENT_TYPE: &str = "application/octet-stream";

/// Parsed Azure storage connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub account_name: String,
    pub account_key: String,
    pub blob_endpoint: Url,
}

impl FromStr for ConnectionString {
    type Err = StorageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = |reason: &str| StorageError::InvalidConnectionString {
            reason: reason.to_string(),
        };

        let mut fields: BTreeMap<String, String> = BTreeMap::new();
        for (index, part) in s.split(';').map(str::trim).filter(|p| !p.is_empty()).enumerate() {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| invalid(&format!("segment {} has no '='", index + 1)))?;
            fields.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        let account_name = fields
            .get("accountname")
            .filter(|v| !v.is_empty())
            .cloned()
            .ok_or_else(|| invalid("missing AccountName"))?;
        let account_key = fields
            .get("accountkey")
            .filter(|v| !v.is_empty())
            .cloned()
            .ok_or_else(|| invalid("missing AccountKey"))?;

        let endpoint = match fields.get("blobendpoint") {
            Some(endpoint) => endpoint.clone(),
            None => {
                let protocol = fields
                    .get("defaultendpointsprotocol")
                    .map(String::as_str)
                    .unwrap_or("https");
                let suffix = fields
                    .get("endpointsuffix")
                    .map(String::as_str)
                    .unwrap_or("core.windows.net");
                format!("{protocol}://{account_name}.blob.{suffix}")
            }
        };
        let blob_endpoint =
            Url::parse(&endpoint).map_err(|e| invalid(&format!("bad blob endpoint: {e}")))?;

        Ok(Self {
            account_name,
            account_key,
            blob_endpoint,
        })
    }
}

/// Shared Key signing material for one storage account.
#[derive(Clone)]
pub struct SharedKeyCredential {
    account: String,
    key: Vec<u8>,
}

impl std::fmt::Debug for SharedKeyCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedKeyCredential")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

impl SharedKeyCredential {
    /// Build a credential from an account name and its base64 account key.
    pub fn new(account: impl Into<String>, key_b64: &str) -> std::result::Result<Self, StorageError> {
        let key = BASE64
            .decode(key_b64.trim())
            .map_err(|e| StorageError::InvalidConnectionString {
                reason: format!("AccountKey is not valid base64: {e}"),
            })?;
        Ok(Self {
            account: account.into(),
            key,
        })
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// Base64 HMAC-SHA256 signature of a string-to-sign.
    pub fn sign(&self, string_to_sign: &str) -> std::result::Result<String, StorageError> {
        let mut mac = HmacSha256::new_from_slice(&self.key).map_err(|e| StorageError::Request {
            message: format!("HMAC error: {e}"),
        })?;
        mac.update(string_to_sign.as_bytes());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }

    /// Value for the `Authorization` header.
    pub fn authorization(&self, string_to_sign: &str) -> std::result::Result<String, StorageError> {
        Ok(format!("SharedKey {}:{}", self.account, self.sign(string_to_sign)?))
    }

    /// Canonicalized resource for a request URL: `/<account><encoded path>`.
    pub fn canonical_resource(&self, url: &Url) -> String {
        format!("/{}{}", self.account, url.path())
    }
}

/// The parts of a request that participate in the Shared Key signature.
#[derive(Debug, Clone)]
pub struct SignableRequest<'a> {
    pub method: &'a str,
    pub content_length: usize,
    pub content_type: Option<&'a str>,
    pub if_none_match: Option<&'a str>,
    /// `x-ms-*` headers, lowercase names.
    pub ms_headers: BTreeMap<String, String>,
    pub canonical_resource: String,
}

impl SignableRequest<'_> {
    /// Build the Blob service string-to-sign (versions 2015-02-21 and later).
    pub fn string_to_sign(&self) -> String {
        let content_length = if self.content_length == 0 {
            String::new()
        } else {
            self.content_length.to_string()
        };
        let headers: String = self
            .ms_headers
            .iter()
            .map(|(name, value)| format!("{}:{}\n", name, value.trim()))
            .collect();

        [
            self.method,
            "", // Content-Encoding
            "", // Content-Language
            content_length.as_str(),
            "", // Content-MD5
            self.content_type.unwrap_or(""),
            "", // Date (x-ms-date is used instead)
            "", // If-Modified-Since
            "", // If-Match
            self.if_none_match.unwrap_or(""),
            "", // If-Unmodified-Since
            "", // Range
        ]
        .join("\n")
            + "\n"
            + &headers
            + &self.canonical_resource
    }
}

/// RFC 1123 timestamp for the `x-ms-date` header.
pub fn ms_date(now: chrono::DateTime<chrono::Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Blob store backed by an Azure storage account.
#[derive(Debug, Clone)]
pub struct AzureBlobStore {
    client: reqwest::Client,
    credential: SharedKeyCredential,
    endpoint: Url,
}

impl AzureBlobStore {
    pub fn new(
        credential: SharedKeyCredential,
        endpoint: Url,
        timeout: Duration,
    ) -> std::result::Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| StorageError::Request {
                message: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            credential,
            endpoint,
        })
    }

    pub fn from_connection_string(
        conn: &str,
        timeout: Duration,
    ) -> std::result::Result<Self, StorageError> {
        let parsed: ConnectionString = conn.parse()?;
        let credential = SharedKeyCredential::new(parsed.account_name, &parsed.account_key)?;
        Self::new(credential, parsed.blob_endpoint, timeout)
    }

    /// Full URL of a blob, with each path segment percent-encoded.
    pub fn blob_url(&self, blob: &BlobRef) -> std::result::Result<Url, StorageError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| StorageError::InvalidConnectionString {
                reason: format!("blob endpoint {} cannot carry a path", self.endpoint),
            })?
            .pop_if_empty()
            .push(&blob.container)
            .extend(blob.blob.split('/'));
        Ok(url)
    }

    fn base_headers(&self) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        headers.insert("x-ms-date".to_string(), ms_date(chrono::Utc::now()));
        headers.insert("x-ms-version".to_string(), API_VERSION.to_string());
        headers
    }

    fn status_error(status: StatusCode, blob: &BlobRef) -> StorageError {
        StorageError::Status {
            status: status.as_u16(),
            container: blob.container.clone(),
            blob: blob.blob.clone(),
        }
    }
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    async fn download(&self, blob: &BlobRef) -> Result<Vec<u8>> {
        let url = self.blob_url(blob)?;
        let signable = SignableRequest {
            method: "GET",
            content_length: 0,
            content_type: None,
            if_none_match: None,
            ms_headers: self.base_headers(),
            canonical_resource: self.credential.canonical_resource(&url),
        };
        let auth = self.credential.authorization(&signable.string_to_sign())?;

        let mut request = self.client.get(url).header(AUTHORIZATION, auth);
        for (name, value) in &signable.ms_headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(StorageError::from)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound {
                container: blob.container.clone(),
                blob: blob.blob.clone(),
            }
            .into());
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::debug!(blob = %blob, %status, detail = %detail, "Get Blob failed");
            return Err(Self::status_error(status, blob).into());
        }

        let bytes = response.bytes().await.map_err(StorageError::from)?;
        Ok(bytes.to_vec())
    }

    async fn upload(&self, blob: &BlobRef, data: Vec<u8>, overwrite: bool) -> Result<()> {
        let url = self.blob_url(blob)?;
        let mut ms_headers = self.base_headers();
        ms_headers.insert("x-ms-blob-type".to_string(), "BlockBlob".to_string());
        let if_none_match = (!overwrite).then_some("*");
        let signable = SignableRequest {
            method: "PUT",
            content_length: data.len(),
            content_type: Some(BLOB_CONTENT_TYPE),
            if_none_match,
            ms_headers,
            canonical_resource: self.credential.canonical_resource(&url),
        };
        let auth = self.credential.authorization(&signable.string_to_sign())?;

        let mut request = self
            .client
            .put(url)
            .header(AUTHORIZATION, auth)
            .header(CONTENT_TYPE, BLOB_CONTENT_TYPE);
        if let Some(value) = if_none_match {
            request = request.header(IF_NONE_MATCH, value);
        }
        for (name, value) in &signable.ms_headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.body(data).send().await.map_err(StorageError::from)?;
        let status = response.status();
        if !overwrite && (status == StatusCode::CONFLICT || status == StatusCode::PRECONDITION_FAILED)
        {
            return Err(StorageError::AlreadyExists {
                container: blob.container.clone(),
                blob: blob.blob.clone(),
            }
            .into());
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::debug!(blob = %blob, %status, detail = %detail, "Put Blob failed");
            return Err(Self::status_error(status, blob).into());
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("azure:{}", self.endpoint)
    }
}
