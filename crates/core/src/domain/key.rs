// Resource Key - `namespace/name` identity of a cluster object

use super::error::{DomainError, Result};
use std::fmt;

/// Identifies one cluster object of a given kind.
///
/// Namespaced objects render as `namespace/name`, cluster-scoped objects as `name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    namespace: Option<String>,
    name: String,
}

impl ResourceKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            namespace: (!namespace.is_empty()).then_some(namespace),
            name: name.into(),
        }
    }

    pub fn cluster_scoped(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    /// Parse a `namespace/name` or `name` string
    ///
    /// # Errors
    /// - more than one `/` separator
    /// - empty name
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason| DomainError::InvalidKey {
            key: raw.to_string(),
            reason,
        };

        let (namespace, name) = match raw.split_once('/') {
            Some((_, rest)) if rest.contains('/') => return Err(invalid("unexpected '/' in name")),
            Some((namespace, name)) => (namespace, name),
            None => ("", raw),
        };

        if name.is_empty() {
            return Err(invalid("name is empty"));
        }

        Ok(Self::new(namespace, name))
    }

    /// Key of an object from its metadata, failing when the name is missing
    pub fn from_meta(namespace: Option<&str>, name: Option<&str>) -> Result<Self> {
        match name {
            Some(name) if !name.is_empty() => Ok(Self::new(namespace.unwrap_or_default(), name)),
            _ => Err(DomainError::MissingName {
                namespace: namespace.map(str::to_string),
            }),
        }
    }

    /// Namespace, empty for cluster-scoped objects
    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{}/{}", namespace, self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl std::str::FromStr for ResourceKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_namespaced_key() {
        let key = ResourceKey::parse("team-a/web-1").unwrap();
        assert_eq!(key.namespace(), "team-a");
        assert_eq!(key.name(), "web-1");
        assert_eq!(key.to_string(), "team-a/web-1");
    }

    #[test]
    fn test_parse_cluster_scoped_key() {
        let key = ResourceKey::parse("node-1").unwrap();
        assert_eq!(key.namespace(), "");
        assert_eq!(key, ResourceKey::cluster_scoped("node-1"));
        assert_eq!(key.to_string(), "node-1");
    }

    #[test]
    fn test_parse_rejects_extra_separator() {
        let err = ResourceKey::parse("a/b/c").unwrap_err();
        assert!(err.to_string().contains("unexpected '/'"));
    }

    #[test]
    fn test_parse_rejects_empty_name() {
        assert!(ResourceKey::parse("ns/").is_err());
        assert!(ResourceKey::parse("").is_err());
    }

    #[test]
    fn test_from_meta_requires_name() {
        assert!(ResourceKey::from_meta(Some("ns"), None).is_err());
        assert!(ResourceKey::from_meta(Some("ns"), Some("")).is_err());
        assert_eq!(
            ResourceKey::from_meta(Some("ns"), Some("p")).unwrap(),
            ResourceKey::new("ns", "p")
        );
    }
}
