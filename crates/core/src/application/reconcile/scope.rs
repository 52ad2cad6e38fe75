// Namespace scope - which namespaces the scale-to-zero policy may act in

use std::collections::BTreeSet;
use std::sync::Arc;

/// Predicate gating the scale-to-zero policy per pod namespace
pub trait NamespaceScope: Send + Sync {
    fn allows(&self, namespace: &str) -> bool;
}

impl<F> NamespaceScope for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn allows(&self, namespace: &str) -> bool {
        self(namespace)
    }
}

/// Every namespace is in scope
pub struct AllNamespaces;

impl NamespaceScope for AllNamespaces {
    fn allows(&self, _namespace: &str) -> bool {
        true
    }
}

/// Explicit set of namespaces
#[derive(Debug, Clone, Default)]
pub struct NamespaceAllowList {
    namespaces: BTreeSet<String>,
}

impl NamespaceAllowList {
    pub fn new<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            namespaces: namespaces
                .into_iter()
                .map(|ns| ns.as_ref().trim().to_string())
                .filter(|ns| !ns.is_empty())
                .collect(),
        }
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespaces.iter().map(String::as_str)
    }
}

impl NamespaceScope for NamespaceAllowList {
    fn allows(&self, namespace: &str) -> bool {
        self.namespaces.contains(namespace)
    }
}

/// Build a scope from configured entries; a `*` entry selects every namespace
pub fn scope_from_entries<I, S>(entries: I) -> Arc<dyn NamespaceScope>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let entries: Vec<S> = entries.into_iter().collect();
    if entries.iter().any(|e| e.as_ref().trim() == "*") {
        Arc::new(AllNamespaces)
    } else {
        Arc::new(NamespaceAllowList::new(entries))
    }
}
