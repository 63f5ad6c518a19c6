//! Route classification into caching policy classes.

use std::fmt;

use edge_core::{CacheConfig, ConfigError, RequestDescriptor, ResourceType};
use serde::{Deserialize, Serialize};

use crate::region::RegionKind;

/// Caching strategy assigned to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyClass {
    /// Never stored; passes straight to the network.
    NeverCache,
    /// Network-first with stale fallback.
    DynamicApi,
    /// Cache-first, uncapped.
    StaticImmutable,
    /// Cache-first, capped.
    Media,
    /// Cache-first with root-document fallback.
    Document,
}

impl PolicyClass {
    /// Region that stores entries for this class.
    pub fn region(&self) -> Option<RegionKind> {
        match self {
            Self::NeverCache => None,
            Self::DynamicApi => Some(RegionKind::Api),
            Self::StaticImmutable => Some(RegionKind::Static),
            Self::Media => Some(RegionKind::Images),
            Self::Document => Some(RegionKind::Pages),
        }
    }

    /// Kebab-case name of this class.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NeverCache => "never-cache",
            Self::DynamicApi => "dynamic-api",
            Self::StaticImmutable => "static-immutable",
            Self::Media => "media",
            Self::Document => "document",
        }
    }
}

impl fmt::Display for PolicyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a request was left unclassified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PassThroughReason {
    /// Scheme is neither `http` nor `https`.
    NonHttpScheme,
    /// Request targets another origin.
    CrossOrigin,
    /// Mutating method under the API prefix.
    MutatingApi,
    /// No rule matched.
    Unmatched,
}

impl fmt::Display for PassThroughReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonHttpScheme => write!(f, "non-http-scheme"),
            Self::CrossOrigin => write!(f, "cross-origin"),
            Self::MutatingApi => write!(f, "mutating-api"),
            Self::Unmatched => write!(f, "unmatched"),
        }
    }
}

/// Result of classifying a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum Classification {
    /// The cache manager does not touch this request.
    PassThrough(PassThroughReason),
    /// A caching policy applies.
    Policy(PolicyClass),
}

impl Classification {
    /// The policy class, if one applies.
    pub fn policy(&self) -> Option<PolicyClass> {
        match self {
            Self::Policy(class) => Some(*class),
            Self::PassThrough(_) => None,
        }
    }

    /// Whether the request may read or write any region.
    pub fn touches_cache(&self) -> bool {
        self.policy().and_then(|p| p.region()).is_some()
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PassThrough(reason) => write!(f, "pass-through ({})", reason),
            Self::Policy(class) => write!(f, "{}", class),
        }
    }
}

/// Route rules the classifier matches against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRules {
    origin: String,
    sensitive_prefixes: Vec<String>,
    api_prefix: String,
    fonts_prefix: String,
}

impl RouteRules {
    /// Create rules for a same-origin check against `origin`.
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            sensitive_prefixes: Vec::new(),
            api_prefix: "/api/".to_string(),
            fonts_prefix: "/fonts/".to_string(),
        }
    }

    /// Build rules from a validated configuration.
    pub fn from_config(config: &CacheConfig) -> Result<Self, ConfigError> {
        let origin = config.origin_url()?.origin().ascii_serialization();
        Ok(Self {
            origin,
            sensitive_prefixes: config.sensitive_prefixes.clone(),
            api_prefix: config.api_prefix.clone(),
            fonts_prefix: config.fonts_prefix.clone(),
        })
    }

    /// Add a sensitive prefix.
    pub fn with_sensitive_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.sensitive_prefixes.push(prefix.into());
        self
    }

    /// Set the API prefix.
    pub fn with_api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into();
        self
    }

    /// Set the fonts prefix.
    pub fn with_fonts_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.fonts_prefix = prefix.into();
        self
    }

    /// The origin requests must share to be classified.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Classify a request. First matching rule wins; every request gets an
    /// answer.
    pub fn classify(&self, request: &RequestDescriptor) -> Classification {
        use Classification::{PassThrough, Policy};

        if !matches!(request.scheme(), "http" | "https") {
            return PassThrough(PassThroughReason::NonHttpScheme);
        }

        if request.origin() != self.origin {
            return PassThrough(PassThroughReason::CrossOrigin);
        }

        let path = request.path();

        if self
            .sensitive_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            return Policy(PolicyClass::NeverCache);
        }

        if path.starts_with(self.api_prefix.as_str()) {
            return if request.is_read() {
                Policy(PolicyClass::DynamicApi)
            } else {
                PassThrough(PassThroughReason::MutatingApi)
            };
        }

        match request.resource_type() {
            ResourceType::Script | ResourceType::Style => {
                return Policy(PolicyClass::StaticImmutable)
            }
            _ => {}
        }

        if path.starts_with(self.fonts_prefix.as_str()) {
            return Policy(PolicyClass::StaticImmutable);
        }

        if request.resource_type() == ResourceType::Image {
            return Policy(PolicyClass::Media);
        }

        if request.resource_type() == ResourceType::Document || request.is_navigation() {
            return Policy(PolicyClass::Document);
        }

        PassThrough(PassThroughReason::Unmatched)
    }
}

#[cfg(test)]
mod tests {
    use http::Method;

    use super::*;

    fn rules() -> RouteRules {
        RouteRules::from_config(&CacheConfig::new("v1", "https://example.com")).unwrap()
    }

    fn req(method: Method, path: &str) -> RequestDescriptor {
        RequestDescriptor::new(method, &format!("https://example.com{}", path)).unwrap()
    }

    #[test]
    fn test_login_is_never_cache() {
        let c = rules().classify(&req(Method::GET, "/login"));
        assert_eq!(c, Classification::Policy(PolicyClass::NeverCache));
        assert!(!c.touches_cache());
    }

    #[test]
    fn test_mutating_api_is_pass_through() {
        let c = rules().classify(&req(Method::POST, "/api/items"));
        assert_eq!(c, Classification::PassThrough(PassThroughReason::MutatingApi));
    }

    #[test]
    fn test_api_reads_are_dynamic() {
        let r = rules();
        assert_eq!(
            r.classify(&req(Method::GET, "/api/items")),
            Classification::Policy(PolicyClass::DynamicApi)
        );
        assert_eq!(
            r.classify(&req(Method::HEAD, "/api/items")),
            Classification::Policy(PolicyClass::DynamicApi)
        );
    }

    #[test]
    fn test_sensitive_wins_over_api() {
        let r = rules().with_sensitive_prefix("/api/auth");
        assert_eq!(
            r.classify(&req(Method::GET, "/api/auth/session")),
            Classification::Policy(PolicyClass::NeverCache)
        );
    }

    #[test]
    fn test_non_http_scheme() {
        let r = rules();
        let ext = RequestDescriptor::get("chrome-extension://abc/script.js")
            .unwrap()
            .with_resource_type(ResourceType::Script);
        assert_eq!(
            r.classify(&ext),
            Classification::PassThrough(PassThroughReason::NonHttpScheme)
        );
    }

    #[test]
    fn test_cross_origin() {
        let r = rules();
        let cdn = RequestDescriptor::get("https://cdn.example.net/app.js")
            .unwrap()
            .with_resource_type(ResourceType::Script);
        assert_eq!(
            r.classify(&cdn),
            Classification::PassThrough(PassThroughReason::CrossOrigin)
        );

        let other_port = RequestDescriptor::get("https://example.com:8443/app.js")
            .unwrap()
            .with_resource_type(ResourceType::Script);
        assert_eq!(
            r.classify(&other_port),
            Classification::PassThrough(PassThroughReason::CrossOrigin)
        );
    }

    #[test]
    fn test_scripts_styles_and_fonts_are_static() {
        let r = rules();
        let script = req(Method::GET, "/assets/app.js").with_resource_type(ResourceType::Script);
        let style = req(Method::GET, "/assets/site.css").with_resource_type(ResourceType::Style);
        let font = req(Method::GET, "/fonts/inter.woff2");

        for request in [script, style, font] {
            assert_eq!(
                r.classify(&request),
                Classification::Policy(PolicyClass::StaticImmutable)
            );
        }
    }

    #[test]
    fn test_images_are_media() {
        let image = req(Method::GET, "/img/hero.webp").with_resource_type(ResourceType::Image);
        assert_eq!(rules().classify(&image), Classification::Policy(PolicyClass::Media));
    }

    #[test]
    fn test_documents_and_navigations() {
        let r = rules();
        let doc = req(Method::GET, "/pricing").with_resource_type(ResourceType::Document);
        let nav = req(Method::GET, "/blog/launch").navigate();

        assert_eq!(r.classify(&doc), Classification::Policy(PolicyClass::Document));
        assert_eq!(r.classify(&nav), Classification::Policy(PolicyClass::Document));
    }

    #[test]
    fn test_unmatched() {
        let c = rules().classify(&req(Method::GET, "/manifest.webmanifest"));
        assert_eq!(c, Classification::PassThrough(PassThroughReason::Unmatched));
    }

    #[test]
    fn test_policy_regions() {
        assert_eq!(PolicyClass::NeverCache.region(), None);
        assert_eq!(PolicyClass::DynamicApi.region(), Some(RegionKind::Api));
        assert_eq!(PolicyClass::StaticImmutable.region(), Some(RegionKind::Static));
        assert_eq!(PolicyClass::Media.region(), Some(RegionKind::Images));
        assert_eq!(PolicyClass::Document.region(), Some(RegionKind::Pages));
    }

    #[test]
    fn test_classification_serialization() {
        let json = serde_json::to_string(&Classification::Policy(PolicyClass::DynamicApi)).unwrap();
        assert_eq!(json, r#"{"kind":"policy","value":"dynamic-api"}"#);
    }
}
