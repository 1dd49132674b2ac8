//! Token extraction from request-like contexts

use std::collections::HashMap;

use crate::domain::value_objects::{SeekLocation, SeekSource};

const BEARER_SCHEME: &str = "Bearer";

/// Read access to the parts of an inbound request a token may be carried in
///
/// Implement this for a framework request type to locate tokens in it.
pub trait RequestParts {
    /// Header value by name; lookups are expected to be case-insensitive
    fn header(&self, name: &str) -> Option<String>;

    fn query(&self, name: &str) -> Option<String>;

    /// Cookie value only, without attributes
    fn cookie(&self, name: &str) -> Option<String>;

    fn form(&self, name: &str) -> Option<String>;
}

/// Owned request snapshot, handy for RPC metadata and tests
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    headers: HashMap<String, String>,
    query: HashMap<String, String>,
    cookies: HashMap<String, String>,
    form: HashMap<String, String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Shorthand for `Authorization: Bearer <token>`
    pub fn with_bearer(self, token: impl AsRef<str>) -> Self {
        let value = format!("{} {}", BEARER_SCHEME, token.as_ref());
        self.with_header("Authorization", value)
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_form(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.insert(name.into(), value.into());
        self
    }
}

impl RequestParts for RequestContext {
    fn header(&self, name: &str) -> Option<String> {
        self.headers.get(&name.to_ascii_lowercase()).cloned()
    }

    fn query(&self, name: &str) -> Option<String> {
        self.query.get(name).cloned()
    }

    /// Explicit cookies first, then the raw `Cookie` header
    fn cookie(&self, name: &str) -> Option<String> {
        if let Some(value) = self.cookies.get(name) {
            return Some(value.clone());
        }

        let raw = self.header("Cookie")?;
        raw.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim().trim_matches('"').to_string())
        })
    }

    fn form(&self, name: &str) -> Option<String> {
        self.form.get(name).cloned()
    }
}

/// Ordered token extraction policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenLocator {
    locations: Vec<SeekLocation>,
}

impl Default for TokenLocator {
    fn default() -> Self {
        Self {
            locations: vec![SeekLocation::default()],
        }
    }
}

impl TokenLocator {
    /// Creates a locator; an empty list falls back to `header:Authorization`
    pub fn new(locations: Vec<SeekLocation>) -> Self {
        if locations.is_empty() {
            return Self::default();
        }
        Self { locations }
    }

    /// Parses a comma-separated `source:field` list
    ///
    /// Malformed entries and unknown sources are skipped with a warning.
    pub fn from_config(locations: &str) -> Self {
        let locations = locations
            .split(',')
            .filter(|entry| !entry.trim().is_empty())
            .filter_map(|entry| match entry.parse::<SeekLocation>() {
                Ok(location) => Some(location),
                Err(reason) => {
                    tracing::warn!(entry = %entry.trim(), %reason, "Ignoring token location");
                    None
                }
            })
            .collect();

        Self::new(locations)
    }

    pub fn locations(&self) -> &[SeekLocation] {
        &self.locations
    }

    /// Returns the first non-empty token found, consulting rules in order
    pub fn locate<R>(&self, request: &R) -> Option<String>
    where
        R: RequestParts + ?Sized,
    {
        self.locations.iter().find_map(|location| {
            let value = match location.source {
                SeekSource::Header => request
                    .header(&location.field)
                    .and_then(|value| strip_bearer(&value)),
                SeekSource::Query => request.query(&location.field),
                SeekSource::Cookie => request.cookie(&location.field),
                SeekSource::Form => request.form(&location.field),
            };
            value.filter(|token| !token.is_empty())
        })
    }
}

/// `Bearer <token>` only; any other scheme yields nothing
fn strip_bearer(value: &str) -> Option<String> {
    let (scheme, token) = value.split_once(' ')?;
    (scheme == BEARER_SCHEME).then(|| token.to_string())
}
