//! Repository manifests (JSON) for site-specific experiment and system types.
//!
//! JSON shape:
//! {
//!   "namespace": "mysite",
//!   "experiments": [
//!     {
//!       "name": "stream",
//!       "description": "...",
//!       "inherits": ["experiment", "openmp"],   // built-in capabilities
//!       "variants": [
//!         { "name": "size", "default": "small", "values": ["small", "large"] },
//!         { "name": "threads", "default": 4, "values": "int" },
//!         { "name": "caliper", "values": { "any_combination_of": ["time", "mpi"] } },
//!         { "name": "gpu-arch", "default": "none", "when": "+cuda", "sticky": true }
//!       ]
//!     }
//!   ],
//!   "systems": [ ... same shape ... ]
//! }
//!
//! Raw structs mirror the file; `validate_and_build` turns them into
//! repositories through the same builder the built-in types use.

use crate::directive::{Capability, SpecTypeBuilder};
use crate::repo::{ObjectType, Repository};
use crate::spec::lexer::{IDENTIFIER, cached_regex};
use crate::variant::{ValueSet, ValueType, VariantArgs, WILDCARD};
use anyhow::{Context, bail};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct RepoManifest {
    #[serde(default)]
    pub namespace: String,

    #[serde(default)]
    pub experiments: Vec<RawSpecType>,

    #[serde(default)]
    pub systems: Vec<RawSpecType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSpecType {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub inherits: Vec<String>,

    #[serde(default)]
    pub variants: Vec<RawVariant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawVariant {
    pub name: String,

    /// String, number or boolean; stored as its string form.
    #[serde(default)]
    pub default: Option<serde_json::Value>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub values: Option<RawValues>,

    #[serde(default)]
    pub multi: Option<bool>,

    #[serde(default)]
    pub when: Option<String>,

    #[serde(default)]
    pub sticky: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawValues {
    // ["a", "b"]
    List(Vec<String>),
    // "*", "int", "float", "bool"
    Keyword(String),
    // { "any_combination_of": ["a", "b"] }
    Combination { any_combination_of: Vec<String> },
}

/// Experiment and system repositories built from one manifest.
#[derive(Debug, Clone)]
pub struct ValidatedManifest {
    pub experiments: Repository,
    pub systems: Repository,
}

impl RawVariant {
    fn to_args(&self) -> anyhow::Result<VariantArgs> {
        let mut args = VariantArgs::new(&self.name);

        if let Some(default) = &self.default {
            let text = match default {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Number(n) => n.to_string(),
                other => bail!("default must be a string, number or boolean, got {}", other),
            };
            args = args.default(text);
        }

        args = match &self.values {
            None => args,
            Some(RawValues::List(values)) => args.values(values.iter().cloned()),
            Some(RawValues::Keyword(k)) if k == WILDCARD => args.any_value(),
            Some(RawValues::Keyword(k)) => match ValueType::from_name(k) {
                Some(ty) => args.of_type(ty),
                None => bail!(
                    "unknown values keyword {:?} (expected \"*\", \"int\", \"float\" or \"bool\")",
                    k
                ),
            },
            Some(RawValues::Combination { any_combination_of }) => {
                args.value_set(ValueSet::any_combination_of(any_combination_of.iter().cloned()))
            }
        };

        if let Some(description) = &self.description {
            args = args.description(description);
        }
        if let Some(multi) = self.multi {
            args = args.multi(multi);
        }
        if let Some(when) = &self.when {
            args = args.when(when);
        }
        if let Some(sticky) = self.sticky {
            args = args.sticky(sticky);
        }
        Ok(args)
    }
}

impl RepoManifest {
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Check names and capabilities, then build every declared type.
    pub fn validate_and_build(
        &self,
        capabilities: &BTreeMap<String, Capability>,
    ) -> anyhow::Result<ValidatedManifest> {
        let namespace = self.namespace.trim();
        if namespace.is_empty() {
            bail!("repository manifest has an empty namespace");
        }
        static NAMESPACE: OnceLock<Regex> = OnceLock::new();
        let namespace_pattern = format!(r"^{IDENTIFIER}(?:\.{IDENTIFIER})*$");
        if !cached_regex(&NAMESPACE, &namespace_pattern)?.is_match(namespace) {
            bail!("invalid repository namespace {:?}", namespace);
        }

        let experiments =
            build_repository(namespace, ObjectType::Experiment, &self.experiments, capabilities)?;
        let systems = build_repository(namespace, ObjectType::System, &self.systems, capabilities)?;

        Ok(ValidatedManifest {
            experiments,
            systems,
        })
    }
}

fn build_repository(
    namespace: &str,
    object_type: ObjectType,
    raw_types: &[RawSpecType],
    capabilities: &BTreeMap<String, Capability>,
) -> anyhow::Result<Repository> {
    static TYPE_NAME: OnceLock<Regex> = OnceLock::new();
    let type_name = cached_regex(&TYPE_NAME, &format!("^{IDENTIFIER}$"))?;
    let mut repo = Repository::new(namespace, object_type);

    for raw in raw_types {
        if !type_name.is_match(&raw.name) {
            bail!("invalid {} name {:?} in namespace '{}'", object_type, raw.name, namespace);
        }
        if repo.contains(&raw.name) {
            bail!("duplicate {} '{}' in namespace '{}'", object_type, raw.name, namespace);
        }

        let mut builder = SpecTypeBuilder::new(&raw.name);
        builder.describe(&raw.description);

        for base in &raw.inherits {
            let Some(capability) = capabilities.get(base) else {
                let known: Vec<&str> = capabilities.keys().map(String::as_str).collect();
                bail!(
                    "{} '{}' inherits unknown capability '{}' (known: {})",
                    object_type,
                    raw.name,
                    base,
                    known.join(", ")
                );
            };
            builder.inherit(capability);
        }

        let mut seen: BTreeSet<(&str, &str)> = BTreeSet::new();
        for variant in &raw.variants {
            let key = (variant.name.as_str(), variant.when.as_deref().unwrap_or(""));
            if !seen.insert(key) {
                warn!(
                    spec_type = %raw.name,
                    variant = %variant.name,
                    "variant declared twice; the later declaration wins"
                );
            }

            let args = variant.to_args().with_context(|| {
                format!("{} '{}', variant '{}'", object_type, raw.name, variant.name)
            })?;
            builder.variant(args).with_context(|| {
                format!("{} '{}' in namespace '{}'", object_type, raw.name, namespace)
            })?;
        }

        let descriptor = builder
            .build()
            .with_context(|| format!("build {} '{}'", object_type, raw.name))?;
        repo.add(descriptor);
    }

    Ok(repo)
}

/// Read, parse and validate a manifest file.
pub fn load_manifest(
    path: &Path,
    capabilities: &BTreeMap<String, Capability>,
) -> anyhow::Result<ValidatedManifest> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read repository manifest {}", path.display()))?;
    let manifest = RepoManifest::from_json(&text)
        .with_context(|| format!("parse repository manifest {}", path.display()))?;
    let validated = manifest
        .validate_and_build(capabilities)
        .with_context(|| format!("invalid repository manifest {}", path.display()))?;

    info!(
        path = %path.display(),
        namespace = %manifest.namespace,
        experiments = validated.experiments.len(),
        systems = validated.systems.len(),
        "loaded repository manifest"
    );
    Ok(validated)
}
