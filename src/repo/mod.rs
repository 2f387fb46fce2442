//! Registries of spec types, keyed by namespace.
//!
//! A [`Repository`] holds the experiment or system types of one namespace.
//! A [`RepoPath`] is an ordered list of repositories; concretization asks it
//! which namespace provides a name and for that type's descriptor.

pub mod builtin;
pub mod manifest;

use crate::directive::SpecTypeDescriptor;
use crate::error::SpecError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Experiment,
    System,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ObjectType::Experiment => "experiment",
            ObjectType::System => "system",
        })
    }
}

#[derive(Debug, Clone)]
pub struct Repository {
    namespace: String,
    object_type: ObjectType,
    types: BTreeMap<String, Arc<SpecTypeDescriptor>>,
}

impl Repository {
    pub fn new(namespace: impl Into<String>, object_type: ObjectType) -> Self {
        Self {
            namespace: namespace.into(),
            object_type,
            types: BTreeMap::new(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    /// Register a type, returning the one it replaces.
    pub fn add(&mut self, descriptor: SpecTypeDescriptor) -> Option<Arc<SpecTypeDescriptor>> {
        self.types
            .insert(descriptor.name.clone(), Arc::new(descriptor))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<SpecTypeDescriptor>> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn types(&self) -> impl Iterator<Item = &Arc<SpecTypeDescriptor>> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Ordered search path of repositories. Earlier entries take precedence
/// when listing, but a name provided by several namespaces must be
/// qualified.
#[derive(Debug, Clone, Default)]
pub struct RepoPath {
    repos: Vec<Repository>,
}

impl RepoPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_repos(repos: impl IntoIterator<Item = Repository>) -> Self {
        let mut path = Self::new();
        for repo in repos {
            path.put_last(repo);
        }
        path
    }

    /// Add `repo` in front. A repository with the same namespace is replaced.
    pub fn put_first(&mut self, repo: Repository) {
        self.repos.retain(|r| r.namespace != repo.namespace);
        self.repos.insert(0, repo);
    }

    pub fn put_last(&mut self, repo: Repository) {
        self.repos.retain(|r| r.namespace != repo.namespace);
        self.repos.push(repo);
    }

    pub fn repos(&self) -> &[Repository] {
        &self.repos
    }

    pub fn namespaces(&self) -> Vec<&str> {
        self.repos.iter().map(|r| r.namespace()).collect()
    }

    /// Namespaces providing `name`, in path order.
    pub fn providers(&self, name: &str) -> Vec<&str> {
        self.repos
            .iter()
            .filter(|r| r.contains(name))
            .map(|r| r.namespace())
            .collect()
    }

    /// The one namespace that provides `name`.
    pub fn resolve_namespace(&self, name: &str) -> Result<String, SpecError> {
        match self.providers(name).as_slice() {
            [] => Err(SpecError::UnknownSpecType {
                name: name.to_string(),
            }),
            [namespace] => {
                debug!(name, namespace, "resolved namespace");
                Ok(namespace.to_string())
            }
            many => Err(SpecError::AmbiguousSpecType {
                name: name.to_string(),
                namespaces: many.iter().map(|ns| ns.to_string()).collect(),
            }),
        }
    }

    pub fn get(&self, namespace: &str, name: &str) -> Result<Arc<SpecTypeDescriptor>, SpecError> {
        self.repos
            .iter()
            .find(|r| r.namespace == namespace)
            .and_then(|r| r.get(name))
            .cloned()
            .ok_or_else(|| SpecError::UnknownNamespace {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }

    /// Every provided name, sorted and without duplicates.
    pub fn all_object_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .repos
            .iter()
            .flat_map(|r| r.names().map(str::to_string))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// `(namespace, descriptor)` for every type, in path order.
    pub fn all_types(&self) -> Vec<(&str, &Arc<SpecTypeDescriptor>)> {
        self.repos
            .iter()
            .flat_map(|r| r.types().map(move |t| (r.namespace(), t)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::SpecTypeBuilder;
    use pretty_assertions::assert_eq;

    fn repo(namespace: &str, names: &[&str]) -> Repository {
        let mut repo = Repository::new(namespace, ObjectType::Experiment);
        for name in names {
            repo.add(SpecTypeBuilder::new(*name).build().unwrap());
        }
        repo
    }

    #[test]
    fn namespace_resolution() {
        let path = RepoPath::from_repos([
            repo("builtin", &["saxpy", "hpl"]),
            repo("site", &["hpl", "stream"]),
        ]);

        assert_eq!(path.resolve_namespace("saxpy").unwrap(), "builtin");
        assert_eq!(path.resolve_namespace("stream").unwrap(), "site");
        assert!(matches!(
            path.resolve_namespace("hpl"),
            Err(SpecError::AmbiguousSpecType { ref namespaces, .. })
                if namespaces == &["builtin", "site"]
        ));
        assert!(matches!(
            path.resolve_namespace("lammps"),
            Err(SpecError::UnknownSpecType { .. })
        ));
    }

    #[test]
    fn lookup_by_namespace() {
        let path = RepoPath::from_repos([repo("builtin", &["saxpy"])]);
        assert_eq!(path.get("builtin", "saxpy").unwrap().name, "saxpy");
        assert!(matches!(
            path.get("site", "saxpy"),
            Err(SpecError::UnknownNamespace { .. })
        ));
        assert!(path.get("builtin", "hpl").is_err());
    }

    #[test]
    fn put_first_replaces_same_namespace() {
        let mut path = RepoPath::from_repos([repo("builtin", &["saxpy"]), repo("site", &["a"])]);
        path.put_first(repo("site", &["b"]));
        assert_eq!(path.namespaces(), vec!["site", "builtin"]);
        assert_eq!(path.all_object_names(), vec!["b", "saxpy"]);
    }
}
