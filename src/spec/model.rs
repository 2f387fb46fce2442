//! Abstract and concrete specs, and the partial order between them.

use crate::error::SpecError;
use crate::repo::RepoPath;
use crate::spec::parser::SpecParser;
use crate::variant::{FrozenVariantMap, VariantMap};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Read access plus write-once setters shared by abstract and concrete specs.
pub trait SpecLike {
    fn name(&self) -> Option<&str>;
    fn namespace(&self) -> Option<&str>;
    fn variant_map(&self) -> &VariantMap;
    fn is_concrete(&self) -> bool;

    fn set_name(&mut self, name: &str) -> Result<(), SpecError>;
    fn set_namespace(&mut self, namespace: &str) -> Result<(), SpecError>;
    fn set_variants(&mut self, variants: VariantMap) -> Result<(), SpecError>;

    /// Could `self` and `other` describe a common concrete instance?
    ///
    /// Unset names and namespaces are wildcards. When either side is
    /// concrete nothing is left open on it, so the test reduces to
    /// `satisfies` in that direction.
    fn intersects<O: SpecLike + ?Sized>(&self, other: &O) -> bool
    where
        Self: Sized,
    {
        let compatible = |a: Option<&str>, b: Option<&str>| match (a, b) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        };

        let variants = if self.is_concrete() {
            self.variant_map().satisfies(other.variant_map())
        } else if other.is_concrete() {
            other.variant_map().satisfies(self.variant_map())
        } else {
            self.variant_map().intersects(other.variant_map())
        };

        compatible(self.name(), other.name())
            && compatible(self.namespace(), other.namespace())
            && variants
    }

    /// Is `self` at least as specific as `other` on everything `other` sets?
    fn satisfies<O: SpecLike + ?Sized>(&self, other: &O) -> bool
    where
        Self: Sized,
    {
        other.name().is_none_or(|n| self.name() == Some(n))
            && other.namespace().is_none_or(|ns| self.namespace() == Some(ns))
            && self.variant_map().satisfies(other.variant_map())
    }

    /// `satisfies` against a spec string such as `"programming_model=cuda"`.
    fn satisfies_str(&self, text: &str) -> Result<bool, SpecError>
    where
        Self: Sized,
    {
        Ok(self.satisfies(&Spec::parse(text)?))
    }

    fn intersects_str(&self, text: &str) -> Result<bool, SpecError>
    where
        Self: Sized,
    {
        Ok(self.intersects(&Spec::parse(text)?))
    }
}

/// A possibly partial spec: every field may be unset.
#[derive(Debug, Clone, Default)]
pub struct Spec {
    name: Option<String>,
    namespace: Option<String>,
    variants: VariantMap,
}

impl Spec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Parse text that must contain exactly one spec.
    pub fn parse(text: &str) -> Result<Spec, SpecError> {
        let mut specs = SpecParser::new(text)?.all_specs()?;
        if specs.len() != 1 {
            return Err(SpecError::NotASingleSpec {
                text: text.to_string(),
                count: specs.len(),
            });
        }
        Ok(specs.remove(0))
    }

    pub fn variants(&self) -> &VariantMap {
        &self.variants
    }

    pub fn variants_mut(&mut self) -> &mut VariantMap {
        &mut self.variants
    }

    /// True for the empty spec, which every spec satisfies.
    pub fn is_unconstrained(&self) -> bool {
        self.name.is_none() && self.namespace.is_none() && self.variants.is_empty()
    }

    pub fn fullname(&self) -> Option<String> {
        let name = self.name.as_deref()?;
        Some(match &self.namespace {
            Some(ns) => format!("{ns}.{name}"),
            None => name.to_string(),
        })
    }

    /// Merge the constraints of `other` into this spec.
    pub fn constrain<O: SpecLike + ?Sized>(&mut self, other: &O) -> Result<(), SpecError> {
        if let Some(name) = other.name() {
            match &self.name {
                Some(ours) if ours != name => {
                    return Err(SpecError::ConflictingConstraint {
                        spec: self.to_string(),
                        other: name.to_string(),
                        field: "name",
                    });
                }
                _ => self.name = Some(name.to_string()),
            }
        }

        if let Some(namespace) = other.namespace() {
            match &self.namespace {
                Some(ours) if ours != namespace => {
                    return Err(SpecError::ConflictingConstraint {
                        spec: self.to_string(),
                        other: namespace.to_string(),
                        field: "namespace",
                    });
                }
                _ => self.namespace = Some(namespace.to_string()),
            }
        }

        self.variants.constrain(other.variant_map());
        Ok(())
    }

    pub fn concretize(&self, repos: &RepoPath) -> Result<ConcreteSpec, SpecError> {
        crate::concretize::concretize(self, repos)
    }
}

impl SpecLike for Spec {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    fn variant_map(&self) -> &VariantMap {
        &self.variants
    }

    fn is_concrete(&self) -> bool {
        false
    }

    fn set_name(&mut self, name: &str) -> Result<(), SpecError> {
        self.name = Some(name.to_string());
        Ok(())
    }

    fn set_namespace(&mut self, namespace: &str) -> Result<(), SpecError> {
        self.namespace = Some(namespace.to_string());
        Ok(())
    }

    fn set_variants(&mut self, variants: VariantMap) -> Result<(), SpecError> {
        self.variants = variants;
        Ok(())
    }
}

/// Names equal, namespaces equal or either unset, variant maps equal.
impl PartialEq for Spec {
    fn eq(&self, other: &Self) -> bool {
        let namespaces = match (&self.namespace, &other.namespace) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        };
        self.name == other.name && namespaces && self.variants == other.variants
    }
}

impl FromStr for Spec {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Spec::parse(s)
    }
}

impl fmt::Display for Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render(
            f,
            self.namespace.as_deref(),
            self.name.as_deref(),
            &self.variants,
        )
    }
}

/// A fully resolved spec. Constructed only by concretization; every field
/// is fixed afterwards, so the hash and the rendering are stable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConcreteSpec {
    name: String,
    namespace: String,
    variants: FrozenVariantMap,
}

impl ConcreteSpec {
    pub(crate) fn new(name: String, namespace: String, variants: VariantMap) -> Self {
        Self {
            name,
            namespace,
            variants: variants.freeze(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn fullname(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    pub fn variants(&self) -> &FrozenVariantMap {
        &self.variants
    }

    pub fn values(&self, variant: &str) -> Option<&[String]> {
        self.variants.get(variant)
    }

    /// First value of a variant; single-valued variants have exactly one.
    pub fn value(&self, variant: &str) -> Option<&str> {
        self.values(variant)?.first().map(String::as_str)
    }

    /// SHA-256 of the canonical rendering, hex encoded.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Copy back into an abstract, mutable spec.
    pub fn to_abstract(&self) -> Spec {
        Spec {
            name: Some(self.name.clone()),
            namespace: Some(self.namespace.clone()),
            variants: self.variants.as_map().clone(),
        }
    }

    fn immutable(&self, field: &'static str) -> SpecError {
        SpecError::Immutable {
            spec: self.to_string(),
            field,
        }
    }
}

impl SpecLike for ConcreteSpec {
    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn namespace(&self) -> Option<&str> {
        Some(&self.namespace)
    }

    fn variant_map(&self) -> &VariantMap {
        self.variants.as_map()
    }

    fn is_concrete(&self) -> bool {
        true
    }

    fn set_name(&mut self, _name: &str) -> Result<(), SpecError> {
        Err(self.immutable("name"))
    }

    fn set_namespace(&mut self, _namespace: &str) -> Result<(), SpecError> {
        Err(self.immutable("namespace"))
    }

    fn set_variants(&mut self, _variants: VariantMap) -> Result<(), SpecError> {
        Err(self.immutable("variants"))
    }
}

impl fmt::Display for ConcreteSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render(f, Some(&self.namespace), Some(&self.name), &self.variants)
    }
}

fn render(
    f: &mut fmt::Formatter<'_>,
    namespace: Option<&str>,
    name: Option<&str>,
    variants: &VariantMap,
) -> fmt::Result {
    let mut head = String::new();
    if let Some(ns) = namespace {
        head.push_str(ns);
        head.push('.');
    }
    if let Some(name) = name {
        head.push_str(name);
    }

    let variants = variants.to_string();
    f.write_str(&head)?;
    if !head.is_empty() && !variants.is_empty() && !variants.starts_with(['+', '~']) {
        f.write_str(" ")?;
    }
    f.write_str(&variants)
}
