//! Inbound request descriptors and identity keys.

use std::fmt;
use std::str::FromStr;

use http::Method;
use serde::{Deserialize, Serialize};
use url::Url;

/// Error building a request descriptor.
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),
}

/// Declared destination of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Script,
    Style,
    Image,
    Document,
    #[default]
    Other,
}

impl ResourceType {
    /// Get the lowercase name of this resource type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::Style => "style",
            Self::Image => "image",
            Self::Document => "document",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "script" => Ok(Self::Script),
            "style" => Ok(Self::Style),
            "image" => Ok(Self::Image),
            "document" => Ok(Self::Document),
            "other" | "" => Ok(Self::Other),
            other => Err(DescriptorError::UnknownResourceType(other.to_string())),
        }
    }
}

/// Deterministic key addressing a cache entry: `"{METHOD} {url}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Derive the key for a method and URL.
    ///
    /// Fragments never reach the origin, so they are not part of the key.
    pub fn derive(method: &Method, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self(format!("{} {}", method, url))
    }

    /// Wrap an already-formatted key (e.g. one read back from storage).
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The URL half of the key, if it is well-formed.
    pub fn url(&self) -> Option<&str> {
        self.0.split_once(' ').map(|(_, url)| url)
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable description of an inbound request.
///
/// Carries exactly what the route classifier consumes: method, absolute URL,
/// declared resource type and whether the request is a top-level navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    method: Method,
    url: Url,
    resource_type: ResourceType,
    navigation: bool,
    key: IdentityKey,
}

impl RequestDescriptor {
    /// Create a descriptor from a method and an absolute URL.
    pub fn new(method: Method, url: &str) -> Result<Self, DescriptorError> {
        let url = Url::parse(url).map_err(|source| DescriptorError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        Ok(Self::from_url(method, url))
    }

    /// Create a descriptor from an already-parsed URL.
    pub fn from_url(method: Method, url: Url) -> Self {
        let key = IdentityKey::derive(&method, &url);
        Self {
            method,
            url,
            resource_type: ResourceType::Other,
            navigation: false,
            key,
        }
    }

    /// Create a GET descriptor.
    pub fn get(url: &str) -> Result<Self, DescriptorError> {
        Self::new(Method::GET, url)
    }

    /// Set the declared resource type.
    pub fn with_resource_type(mut self, resource_type: ResourceType) -> Self {
        self.resource_type = resource_type;
        self
    }

    /// Mark as a top-level navigation request.
    pub fn navigate(mut self) -> Self {
        self.navigation = true;
        self
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Absolute request URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// URL scheme (e.g. `https`).
    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// ASCII serialization of the request origin (e.g. `https://example.com`).
    pub fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }

    /// Request path, without query string.
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Declared resource type.
    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    /// Whether this is a top-level navigation.
    pub fn is_navigation(&self) -> bool {
        self.navigation
    }

    /// Whether the method only reads (`GET` or `HEAD`).
    pub fn is_read(&self) -> bool {
        self.method == Method::GET || self.method == Method::HEAD
    }

    /// Identity key used for cache lookups.
    pub fn identity_key(&self) -> &IdentityKey {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_key_is_method_and_url() {
        let req = RequestDescriptor::get("https://example.com/api/items?page=2").unwrap();
        assert_eq!(
            req.identity_key().as_str(),
            "GET https://example.com/api/items?page=2"
        );
        assert_eq!(
            req.identity_key().url(),
            Some("https://example.com/api/items?page=2")
        );
    }

    #[test]
    fn test_identity_key_ignores_fragment() {
        let a = RequestDescriptor::get("https://example.com/about#team").unwrap();
        let b = RequestDescriptor::get("https://example.com/about").unwrap();
        assert_eq!(a.identity_key(), b.identity_key());
    }

    #[test]
    fn test_identity_key_differs_by_method() {
        let get = RequestDescriptor::get("https://example.com/api/items").unwrap();
        let head = RequestDescriptor::new(Method::HEAD, "https://example.com/api/items").unwrap();
        assert_ne!(get.identity_key(), head.identity_key());
    }

    #[test]
    fn test_descriptor_accessors() {
        let req = RequestDescriptor::get("https://example.com/blog/post?x=1")
            .unwrap()
            .with_resource_type(ResourceType::Document)
            .navigate();

        assert_eq!(req.scheme(), "https");
        assert_eq!(req.origin(), "https://example.com");
        assert_eq!(req.path(), "/blog/post");
        assert_eq!(req.resource_type(), ResourceType::Document);
        assert!(req.is_navigation());
        assert!(req.is_read());
    }

    #[test]
    fn test_mutating_methods_are_not_reads() {
        for method in [Method::POST, Method::PUT, Method::DELETE, Method::PATCH] {
            let req = RequestDescriptor::new(method, "https://example.com/api/items").unwrap();
            assert!(!req.is_read());
        }
    }

    #[test]
    fn test_invalid_url() {
        let err = RequestDescriptor::get("/relative/path").unwrap_err();
        assert!(matches!(err, DescriptorError::InvalidUrl { .. }));
    }

    #[test]
    fn test_resource_type_parse() {
        assert_eq!("Script".parse::<ResourceType>().unwrap(), ResourceType::Script);
        assert_eq!("".parse::<ResourceType>().unwrap(), ResourceType::Other);
        assert!("font-face".parse::<ResourceType>().is_err());
    }

    #[test]
    fn test_identity_key_serialization() {
        let key = IdentityKey::from_raw("GET https://example.com/");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, r#""GET https://example.com/""#);
    }
}
