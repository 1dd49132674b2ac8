//! Seek locations describing where a token may be carried in a request.

use std::fmt;
use std::str::FromStr;

/// Default header carrying `Bearer` tokens
pub const DEFAULT_HEADER_FIELD: &str = "Authorization";

/// Request channel a token can be read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeekSource {
    Header,
    Query,
    Cookie,
    Form,
}

impl SeekSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeekSource::Header => "header",
            SeekSource::Query => "query",
            SeekSource::Cookie => "cookie",
            SeekSource::Form => "form",
        }
    }
}

impl FromStr for SeekSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "header" => Ok(SeekSource::Header),
            "query" => Ok(SeekSource::Query),
            "cookie" => Ok(SeekSource::Cookie),
            "form" => Ok(SeekSource::Form),
            _ => Err(format!("Unknown seek source: {}", s)),
        }
    }
}

/// One `(source, field)` extraction rule
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeekLocation {
    pub source: SeekSource,
    pub field: String,
}

impl SeekLocation {
    pub fn new(source: SeekSource, field: impl Into<String>) -> Self {
        Self {
            source,
            field: field.into(),
        }
    }

    pub fn header(field: impl Into<String>) -> Self {
        Self::new(SeekSource::Header, field)
    }

    pub fn query(field: impl Into<String>) -> Self {
        Self::new(SeekSource::Query, field)
    }

    pub fn cookie(field: impl Into<String>) -> Self {
        Self::new(SeekSource::Cookie, field)
    }

    pub fn form(field: impl Into<String>) -> Self {
        Self::new(SeekSource::Form, field)
    }
}

impl Default for SeekLocation {
    fn default() -> Self {
        Self::header(DEFAULT_HEADER_FIELD)
    }
}

impl fmt::Display for SeekLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source.as_str(), self.field)
    }
}

/// Parses a single `source:field` entry; whitespace around either part is ignored
impl FromStr for SeekLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (source, field) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("Malformed seek location: {}", s))?;

        let source = source.trim().parse::<SeekSource>()?;
        let field = field.trim();
        if field.is_empty() {
            return Err(format!("Missing field name in seek location: {}", s));
        }

        Ok(Self::new(source, field))
    }
}
