use std::env;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

use crate::storage::WebsiteConfig;
use crate::types::ConfigError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_CONCURRENCY: usize = 5;
pub const DEFAULT_INDEX_DOCUMENT: &str = "index.html";
pub const DEFAULT_ERROR_DOCUMENT: &str = "error.html";

/// Deploy settings, as merged by the host from its site configuration.
///
/// Keys follow the host's camelCase spelling (`accessKeyId`, `supportSubDir`);
/// snake_case and all-lowercase spellings are accepted as well.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployConfig {
    #[serde(default)]
    pub region: String,

    #[serde(default)]
    pub bucket: String,

    #[serde(default, alias = "access_key_id", alias = "accesskeyid")]
    pub access_key_id: String,

    #[serde(default, alias = "access_key_secret", alias = "accesskeysecret")]
    pub access_key_secret: String,

    #[serde(default = "default_timeout", deserialize_with = "deserialize_timeout")]
    pub timeout: Duration,

    /// Index document suffix for static website hosting
    #[serde(default)]
    pub index: Option<String>,

    /// Error document key for static website hosting
    #[serde(default)]
    pub error: Option<String>,

    #[serde(
        default,
        alias = "support_sub_dir",
        alias = "supportsubdir",
        deserialize_with = "deserialize_flag"
    )]
    pub support_sub_dir: Option<bool>,

    /// Bucket base URL overriding the derived `{bucket}.{region}.aliyuncs.com`
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_secure")]
    pub secure: bool,

    /// Maximum number of uploads in flight
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_secure() -> bool {
    true
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

impl DeployConfig {
    pub fn new(
        region: impl Into<String>,
        bucket: impl Into<String>,
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            bucket: bucket.into(),
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
            timeout: DEFAULT_TIMEOUT,
            index: None,
            error: None,
            support_sub_dir: None,
            endpoint: None,
            secure: true,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Load from `OSS_*` environment variables, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Same as [`DeployConfig::from_env`] over an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut config = Self::new(
            var("OSS_REGION").unwrap_or_default(),
            var("OSS_BUCKET").unwrap_or_default(),
            var("OSS_ACCESSKEYID").unwrap_or_default(),
            var("OSS_ACCESSKEYSECRET").unwrap_or_default(),
        );

        if let Some(raw) = var("OSS_TIMEOUT") {
            config.timeout = parse_timeout(&raw).map_err(|reason| ConfigError::Invalid {
                field: "timeout",
                reason,
            })?;
        }
        config.index = var("OSS_INDEX");
        config.error = var("OSS_ERROR");
        if let Some(raw) = var("OSS_SUPPORT_SUB_DIR") {
            config.support_sub_dir =
                Some(parse_flag(&raw).ok_or_else(|| ConfigError::Invalid {
                    field: "supportSubDir",
                    reason: format!("expected \"true\" or \"false\", got {:?}", raw),
                })?);
        }
        config.endpoint = var("OSS_ENDPOINT");
        if let Some(raw) = var("OSS_CONCURRENCY") {
            config.concurrency = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                field: "concurrency",
                reason: format!("not a number: {:?}", raw),
            })?;
        }

        Ok(config)
    }

    /// Load from a config file (YAML, TOML or JSON by extension).
    ///
    /// A top-level `deploy` table is used when present, so a host site config
    /// can be passed as-is.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .build()?;

        match settings.get::<Self>("deploy") {
            Ok(config) => Ok(config),
            Err(config::ConfigError::NotFound(_)) => Ok(settings.try_deserialize()?),
            Err(e) => Err(e.into()),
        }
    }

    /// Build from the host's merged (dynamic) configuration object.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Check everything the deployer needs before any request goes out.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require("region", &self.region)?;
        require("bucket", &self.bucket)?;
        require("accessKeyId", &self.access_key_id)?;
        require("accessKeySecret", &self.access_key_secret)?;

        if !is_valid_bucket_name(&self.bucket) {
            return Err(ConfigError::Invalid {
                field: "bucket",
                reason: format!(
                    "{:?} must be 3-63 characters of lowercase letters, digits and hyphens",
                    self.bucket
                ),
            });
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid {
                field: "timeout",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid {
                field: "concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        if let Some(index) = &self.index {
            require("index", index)?;
        }
        if let Some(error) = &self.error {
            require("error", error)?;
        }

        self.endpoint_url()?;
        Ok(())
    }

    /// Base URL requests for this bucket are sent to.
    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        let raw = match &self.endpoint {
            Some(endpoint) => {
                let endpoint = endpoint.trim().trim_end_matches('/');
                if endpoint.contains("://") {
                    endpoint.to_string()
                } else {
                    format!("{}://{}", self.scheme(), endpoint)
                }
            }
            None => format!(
                "{}://{}.{}.aliyuncs.com",
                self.scheme(),
                self.bucket,
                normalize_region(&self.region)
            ),
        };

        let url = Url::parse(&raw).map_err(|e| ConfigError::Invalid {
            field: "endpoint",
            reason: format!("{}: {}", raw, e),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::Invalid {
                field: "endpoint",
                reason: format!("unsupported scheme {:?}", other),
            }),
        }
    }

    /// Website configuration to apply, if any of index/error/supportSubDir is set.
    pub fn website(&self) -> Option<WebsiteConfig> {
        if self.index.is_none() && self.error.is_none() && self.support_sub_dir.is_none() {
            return None;
        }

        Some(WebsiteConfig {
            index: self
                .index
                .clone()
                .unwrap_or_else(|| DEFAULT_INDEX_DOCUMENT.to_string()),
            error: Some(
                self.error
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ERROR_DOCUMENT.to_string()),
            ),
            support_sub_dir: self.support_sub_dir,
        })
    }

    fn scheme(&self) -> &'static str {
        if self.secure {
            "https"
        } else {
            "http"
        }
    }
}

impl fmt::Debug for DeployConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployConfig")
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("index", &self.index)
            .field("error", &self.error)
            .field("support_sub_dir", &self.support_sub_dir)
            .field("endpoint", &self.endpoint)
            .field("secure", &self.secure)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

fn require(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::Missing(field))
    } else {
        Ok(())
    }
}

/// `cn-hangzhou` and `oss-cn-hangzhou` both name the same region endpoint.
pub fn normalize_region(region: &str) -> String {
    let region = region.trim();
    if region.starts_with("oss-") {
        region.to_string()
    } else {
        format!("oss-{}", region)
    }
}

fn is_valid_bucket_name(name: &str) -> bool {
    let len_ok = (3..=63).contains(&name.len());
    let chars_ok = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    len_ok && chars_ok && !name.starts_with('-') && !name.ends_with('-')
}

/// Parse a timeout: bare numbers are milliseconds, `ms`/`s`/`m` suffixes are honoured.
pub fn parse_timeout(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let (number, unit) = match raw.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => raw.split_at(idx),
        None => (raw, ""),
    };
    let value: u64 = number
        .parse()
        .map_err(|_| format!("not a duration: {:?}", raw))?;

    let duration = match unit.trim() {
        "" | "ms" => Duration::from_millis(value),
        "s" => Duration::from_secs(value),
        "m" => value
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("out of range: {:?}", raw))?,
        other => return Err(format!("unknown unit {:?} in {:?}", other, raw)),
    };

    if duration.is_zero() {
        return Err("must be greater than zero".to_string());
    }
    Ok(duration)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn deserialize_timeout<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct TimeoutVisitor;

    impl<'de> Visitor<'de> for TimeoutVisitor {
        type Value = Duration;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("milliseconds or a duration string like \"60s\"")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Duration, E> {
            if v == 0 {
                return Err(E::custom("timeout must be greater than zero"));
            }
            Ok(Duration::from_millis(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Duration, E> {
            let v = u64::try_from(v).map_err(|_| E::custom("timeout must not be negative"))?;
            self.visit_u64(v)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
            parse_timeout(v).map_err(E::custom)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Duration, E> {
            Ok(DEFAULT_TIMEOUT)
        }

        fn visit_none<E: de::Error>(self) -> Result<Duration, E> {
            Ok(DEFAULT_TIMEOUT)
        }
    }

    deserializer.deserialize_any(TimeoutVisitor)
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    struct FlagVisitor;

    impl<'de> Visitor<'de> for FlagVisitor {
        type Value = Option<bool>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a boolean or \"true\"/\"false\"")
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Option<bool>, E> {
            Ok(Some(v))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Option<bool>, E> {
            parse_flag(v)
                .map(Some)
                .ok_or_else(|| E::invalid_value(de::Unexpected::Str(v), &self))
        }

        fn visit_unit<E: de::Error>(self) -> Result<Option<bool>, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Option<bool>, E> {
            Ok(None)
        }

        fn visit_some<D2: Deserializer<'de>>(self, d: D2) -> Result<Option<bool>, D2::Error> {
            d.deserialize_any(FlagVisitor)
        }
    }

    deserializer.deserialize_any(FlagVisitor)
}
