use serde_json::Value;
use thiserror::Error;
use url::Url;

pub use crux_http::Http;

pub const MAX_URL_LENGTH: usize = 2048;

/// Lookup replies are decoded as JSON by `crux_http` before they reach `update`.
pub type HttpResult = crux_http::Result<crux_http::Response<Value>>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid URL '{url}': {reason}")]
pub struct UrlError {
    pub url: String,
    pub reason: String,
}

impl UrlError {
    fn new(url: &str, reason: impl Into<String>) -> Self {
        Self {
            url: ValidatedUrl::truncate_url(url),
            reason: reason.into(),
        }
    }
}

/// An absolute `http(s)` URL with a host and no embedded credentials.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatedUrl {
    url: String,
}

impl ValidatedUrl {
    /// Appends `segments` to the base path and `query` as form-encoded pairs.
    pub fn build(base: &str, segments: &[&str], query: &[(&str, &str)]) -> Result<Self, UrlError> {
        let mut parsed = Self::parse(base)?;
        if !segments.is_empty() {
            let mut path = parsed
                .path_segments_mut()
                .map_err(|()| UrlError::new(base, "base URL cannot have path segments"))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        if !query.is_empty() {
            parsed.query_pairs_mut().extend_pairs(query);
        }
        Self::from_parsed(&parsed)
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// The URL with any `api_key` query value masked, for logging.
    pub fn redacted(&self) -> String {
        let Ok(mut parsed) = Url::parse(&self.url) else {
            return Self::truncate_url(&self.url);
        };
        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| {
                let value = if k.eq_ignore_ascii_case("api_key") {
                    "***".to_string()
                } else {
                    v.into_owned()
                };
                (k.into_owned(), value)
            })
            .collect();
        if !pairs.is_empty() {
            parsed.query_pairs_mut().clear().extend_pairs(pairs);
        }
        Self::truncate_url(parsed.as_str())
    }

    fn parse(url: &str) -> Result<Url, UrlError> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(UrlError::new("", "URL cannot be empty"));
        }
        Url::parse(trimmed).map_err(|e| UrlError::new(trimmed, e.to_string()))
    }

    fn from_parsed(parsed: &Url) -> Result<Self, UrlError> {
        let url = parsed.as_str();
        if url.len() > MAX_URL_LENGTH {
            return Err(UrlError::new(
                url,
                format!("URL exceeds maximum length of {MAX_URL_LENGTH} bytes"),
            ));
        }

        let scheme = parsed.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(UrlError::new(
                url,
                format!("invalid scheme '{scheme}', only 'http' and 'https' are allowed"),
            ));
        }

        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(UrlError::new(url, "credentials in URL are not allowed"));
        }

        if parsed.host_str().is_none() {
            return Err(UrlError::new(url, "URL must have a host"));
        }

        Ok(Self {
            url: url.to_string(),
        })
    }

    fn truncate_url(url: &str) -> String {
        match url.char_indices().nth(100) {
            Some((cut, _)) => format!("{}...", &url[..cut]),
            None => url.to_string(),
        }
    }
}
