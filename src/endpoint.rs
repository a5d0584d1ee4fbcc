//! Splits an ntfy subscription URL into the publish endpoint and the topic.
//!
//! `https://ntfy.example.com/alerts` resolves to the endpoint
//! `https://ntfy.example.com` and the topic `alerts`. The split happens at the
//! last `/`, so a trailing slash leaves an empty topic and is rejected.

use regex::Regex;
use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;
use url::Url;

static TOPIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-A-Za-z0-9()@:%_+.~#?=&]+$").unwrap());

/// Errors produced while resolving an ntfy URL. All of them are the
/// malformed-url kind; the variants only say which part was wrong.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("ntfy url {0:?} must follow the format https://ntfy.sh/<topic>")]
    MalformedUrl(String),

    #[error("ntfy url {0:?} must start with http or https")]
    UnsupportedScheme(String),

    #[error("ntfy url {0:?} has an empty topic")]
    EmptyTopic(String),

    #[error("ntfy topic {0:?} contains invalid characters")]
    InvalidTopic(String),
}

/// A resolved ntfy destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSpec {
    base_url: Url,
    topic: String,
}

impl EndpointSpec {
    /// Resolves `raw` into an endpoint and a topic.
    pub fn resolve(raw: &str) -> Result<Self, ResolutionError> {
        let raw = raw.trim();
        let (endpoint, topic) = raw
            .rsplit_once('/')
            .ok_or_else(|| ResolutionError::MalformedUrl(raw.to_string()))?;

        if topic.is_empty() {
            return Err(ResolutionError::EmptyTopic(raw.to_string()));
        }
        if !TOPIC_RE.is_match(topic) {
            return Err(ResolutionError::InvalidTopic(topic.to_string()));
        }

        let base_url =
            Url::parse(endpoint).map_err(|_| ResolutionError::MalformedUrl(raw.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ResolutionError::UnsupportedScheme(raw.to_string()));
        }
        // `http://` followed by a bare topic leaves no host behind the split.
        if base_url.host_str().map_or(true, str::is_empty) {
            return Err(ResolutionError::MalformedUrl(raw.to_string()));
        }

        Ok(Self {
            base_url,
            topic: topic.to_string(),
        })
    }

    /// The publish endpoint, i.e. everything before the final `/`.
    ///
    /// The value is normalized by `Url`: the scheme and host are lowercased and
    /// the path is percent-encoded. The `/` that `Url` appends to a bare origin
    /// is stripped again.
    pub fn base_url(&self) -> &str {
        let url = self.base_url.as_str();
        if self.base_url.path() == "/" {
            url.strip_suffix('/').unwrap_or(url)
        } else {
            url
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl fmt::Display for EndpointSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base_url(), self.topic)
    }
}

/// Where the destination of a request comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routing {
    /// Every request goes to the destination resolved at startup.
    Static(EndpointSpec),
    /// Each request names its destination in its `url` query parameter.
    Dynamic,
}

impl Routing {
    /// Static routing when `ntfy_url` is set and non-empty, dynamic otherwise.
    pub fn from_config(ntfy_url: Option<&str>) -> Result<Self, ResolutionError> {
        match ntfy_url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => EndpointSpec::resolve(url).map(Self::Static),
            None => Ok(Self::Dynamic),
        }
    }

    /// The destination for one request. `request_url` is only consulted in
    /// dynamic mode, where its absence is a malformed url.
    pub fn endpoint_for(
        &self,
        request_url: Option<&str>,
    ) -> Result<Cow<'_, EndpointSpec>, ResolutionError> {
        match self {
            Self::Static(spec) => Ok(Cow::Borrowed(spec)),
            Self::Dynamic => {
                let raw = request_url.unwrap_or_default();
                EndpointSpec::resolve(raw).map(Cow::Owned)
            }
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic)
    }
}
