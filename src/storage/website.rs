// Bucket static-website configuration and its XML body

use serde::{Deserialize, Serialize};

use crate::types::StorageError;

/// Static-website hosting settings of a bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebsiteConfig {
    /// Index document suffix, e.g. `index.html`
    pub index: String,
    /// Error document key, e.g. `error.html`
    pub error: Option<String>,
    /// Serve `dir/` requests from `dir/<index>`; `None` leaves the bucket default
    pub support_sub_dir: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "WebsiteConfiguration")]
struct WebsiteConfigurationXml {
    #[serde(rename = "IndexDocument")]
    index_document: IndexDocumentXml,
    #[serde(
        rename = "ErrorDocument",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    error_document: Option<ErrorDocumentXml>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexDocumentXml {
    #[serde(rename = "Suffix")]
    suffix: String,
    #[serde(
        rename = "SupportSubDir",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    support_sub_dir: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ErrorDocumentXml {
    #[serde(rename = "Key")]
    key: String,
}

/// OSS error body, e.g. `<Error><Code>AccessDenied</Code>...</Error>`
#[derive(Debug, Default, Deserialize)]
#[serde(rename = "Error")]
pub(crate) struct ErrorXml {
    #[serde(rename = "Code", default)]
    pub code: String,
    #[serde(rename = "Message", default)]
    pub message: String,
    #[serde(rename = "RequestId", default)]
    pub request_id: String,
}

impl WebsiteConfig {
    /// Body for `PUT /?website`
    pub fn to_xml(&self) -> Result<String, StorageError> {
        let body = WebsiteConfigurationXml {
            index_document: IndexDocumentXml {
                suffix: self.index.clone(),
                support_sub_dir: self.support_sub_dir,
            },
            error_document: self
                .error
                .as_ref()
                .map(|key| ErrorDocumentXml { key: key.clone() }),
        };

        let xml = quick_xml::se::to_string(&body).map_err(|e| StorageError::Xml(e.to_string()))?;
        Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", xml))
    }

    /// Parse the body of `GET /?website`
    pub fn from_xml(xml: &str) -> Result<Self, StorageError> {
        let parsed: WebsiteConfigurationXml =
            quick_xml::de::from_str(xml).map_err(|e| StorageError::Xml(e.to_string()))?;

        Ok(Self {
            index: parsed.index_document.suffix,
            error: parsed.error_document.map(|doc| doc.key),
            support_sub_dir: parsed.index_document.support_sub_dir,
        })
    }
}

pub(crate) fn parse_error_body(xml: &str) -> Option<ErrorXml> {
    quick_xml::de::from_str(xml).ok()
}
