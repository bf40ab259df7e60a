// OSS REST client over reqwest

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Method, Response, Url};
use tracing::debug;

use super::signer::{content_md5, RequestSigner};
use super::website::{parse_error_body, WebsiteConfig};
use super::{ObjectMeta, ObjectStore, PutObjectOutput};
use crate::config::DeployConfig;
use crate::types::{StorageError, StorageResult};

const XML_CONTENT_TYPE: &str = "application/xml";

/// Client for a single OSS bucket.
///
/// Built per deploy; holds its own connection pool.
pub struct OssClient {
    http: reqwest::Client,
    base_url: Url,
    signer: RequestSigner,
    timeout: Duration,
}

impl OssClient {
    pub fn new(config: &DeployConfig) -> StorageResult<Self> {
        let base_url = config
            .endpoint_url()
            .map_err(|e| StorageError::InvalidRequest(e.to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            base_url,
            signer: RequestSigner::new(
                &config.bucket,
                &config.access_key_id,
                &config.access_key_secret,
            ),
            timeout: config.timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, key: &str, sub_resources: &[&str]) -> StorageResult<Url> {
        let mut url = self.base_url.clone();
        if !key.is_empty() {
            url.path_segments_mut()
                .map_err(|_| {
                    StorageError::InvalidRequest(format!("cannot append key to {}", self.base_url))
                })?
                .pop_if_empty()
                .extend(key.split('/'));
        }
        if !sub_resources.is_empty() {
            url.set_query(Some(&sub_resources.join("&")));
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        key: &str,
        sub_resources: &[&str],
        body: Option<(Bytes, &str)>,
    ) -> StorageResult<Response> {
        let url = self.url(key, sub_resources)?;
        debug!("OSS {} {}", method, url);

        let mut builder = http::Request::builder().method(method).uri(url.as_str());
        let body = match body {
            Some((bytes, content_type)) => {
                builder = builder
                    .header(CONTENT_TYPE, content_type)
                    .header("content-md5", content_md5(&bytes));
                bytes
            }
            None => Bytes::new(),
        };
        let mut request = builder
            .body(body)
            .map_err(|e| StorageError::InvalidRequest(e.to_string()))?;

        self.signer.sign(&mut request)?;

        let request = reqwest::Request::try_from(request)?;
        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| self.map_http_error(e))?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }

    fn map_http_error(&self, e: reqwest::Error) -> StorageError {
        if e.is_timeout() {
            StorageError::Timeout(self.timeout)
        } else {
            StorageError::Http(e)
        }
    }
}

#[async_trait]
impl ObjectStore for OssClient {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> StorageResult<PutObjectOutput> {
        let response = self
            .send(Method::PUT, key, &[], Some((body, content_type)))
            .await?;

        Ok(PutObjectOutput {
            status: response.status().as_u16(),
            etag: etag(response.headers()),
        })
    }

    async fn get_object(&self, key: &str) -> StorageResult<Bytes> {
        let response = self.send(Method::GET, key, &[], None).await?;
        response.bytes().await.map_err(|e| self.map_http_error(e))
    }

    async fn get_object_meta(&self, key: &str) -> StorageResult<ObjectMeta> {
        let response = self.send(Method::HEAD, key, &["objectMeta"], None).await?;
        let headers = response.headers();

        Ok(ObjectMeta {
            status: response.status().as_u16(),
            etag: etag(headers),
            content_length: header_str(headers, "content-length").and_then(|v| v.parse().ok()),
            last_modified: header_str(headers, "last-modified").map(str::to_string),
        })
    }

    async fn put_bucket_website(&self, website: &WebsiteConfig) -> StorageResult<()> {
        let body = Bytes::from(website.to_xml()?);
        self.send(Method::PUT, "", &["website"], Some((body, XML_CONTENT_TYPE)))
            .await?;
        Ok(())
    }

    async fn get_bucket_website(&self) -> StorageResult<WebsiteConfig> {
        let response = self.send(Method::GET, "", &["website"], None).await?;
        let body = response.text().await.map_err(|e| self.map_http_error(e))?;
        WebsiteConfig::from_xml(&body)
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        self.send(Method::DELETE, key, &[], None).await?;
        Ok(())
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn etag(headers: &HeaderMap) -> Option<String> {
    header_str(headers, "etag").map(|v| v.trim_matches('"').to_string())
}

async fn error_from_response(response: Response) -> StorageError {
    let status = response.status().as_u16();
    let header_request_id = header_str(response.headers(), "x-oss-request-id")
        .unwrap_or_default()
        .to_string();
    let body = response.text().await.unwrap_or_default();

    match parse_error_body(&body) {
        Some(error) => StorageError::Service {
            status,
            code: error.code,
            message: error.message,
            request_id: if error.request_id.is_empty() {
                header_request_id
            } else {
                error.request_id
            },
        },
        None => StorageError::Service {
            status,
            code: format!("HTTP{}", status),
            message: body,
            request_id: header_request_id,
        },
    }
}
