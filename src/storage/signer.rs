//! Request authentication for OSS.
//!
//! Signing itself is done by `reqsign`'s Aliyun OSS signer; this module only
//! binds it to the deploy credentials and computes the body digest OSS checks.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqsign::{AliyunCredential, AliyunOssSigner};

use crate::types::{StorageError, StorageResult};

/// Signs requests for one bucket with one static credential pair
pub struct RequestSigner {
    signer: AliyunOssSigner,
    credential: AliyunCredential,
}

impl RequestSigner {
    pub fn new(bucket: &str, access_key_id: &str, access_key_secret: &str) -> Self {
        Self {
            signer: AliyunOssSigner::new(bucket),
            credential: AliyunCredential {
                access_key_id: access_key_id.to_string(),
                access_key_secret: access_key_secret.to_string(),
                ..Default::default()
            },
        }
    }

    /// Adds `Date` and `Authorization` to `req`.
    pub fn sign<T>(&self, req: &mut http::Request<T>) -> StorageResult<()> {
        self.signer
            .sign(req, &self.credential)
            .map_err(|e| StorageError::Sign(e.to_string()))
    }
}

/// Base64 of the MD5 digest, as sent in `Content-MD5`
pub fn content_md5(body: &[u8]) -> String {
    BASE64.encode(md5::compute(body).0)
}
