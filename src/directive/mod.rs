//! Directive registry.
//!
//! A spec type is declared through a [`SpecTypeBuilder`]. Each directive
//! call is checked immediately and queued as a closure; `build()` then
//! creates an empty [`SpecTypeDescriptor`] and applies, in order, the
//! closures inherited from capabilities followed by the builder's own.
//!
//! Capabilities are reusable bundles of directives (the `openmp` or `cuda`
//! parts of an experiment). They are builders turned into a shareable
//! directive list with [`SpecTypeBuilder::into_capability`].

use crate::error::DirectiveError;
use crate::variant::{Variant, VariantArgs, VariantOptions};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Structured attributes a directive may populate on a descriptor.
pub const KNOWN_DICTIONARIES: &[&str] = &["variants"];

pub type DirectiveFn =
    Arc<dyn Fn(&mut SpecTypeDescriptor) -> Result<(), DirectiveError> + Send + Sync>;

/// A queued directive closure.
#[derive(Clone)]
pub struct Directive {
    pub name: String,
    pub dicts: Vec<String>,
    apply: DirectiveFn,
}

impl Directive {
    fn same_as(&self, other: &Directive) -> bool {
        Arc::ptr_eq(&self.apply, &other.apply)
    }
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directive")
            .field("name", &self.name)
            .field("dicts", &self.dicts)
            .finish()
    }
}

/// Named bundle of directives that spec types can inherit.
#[derive(Debug, Clone)]
pub struct Capability {
    pub name: String,
    directives: Vec<Directive>,
}

impl Capability {
    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }
}

/// Finalized metadata of one spec type.
#[derive(Debug, Clone, Default)]
pub struct SpecTypeDescriptor {
    pub name: String,
    pub description: String,
    /// Capability names, in inheritance order.
    pub bases: Vec<String>,
    variants: Vec<Variant>,
}

impl SpecTypeDescriptor {
    fn empty(name: &str, description: &str, bases: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            bases,
            variants: Vec::new(),
        }
    }

    /// Record a declaration. A later declaration with the same name and
    /// condition replaces the earlier one in place.
    pub fn declare(&mut self, variant: Variant) {
        let existing = self
            .variants
            .iter_mut()
            .find(|v| v.name == variant.name && v.when == variant.when);
        match existing {
            Some(slot) => *slot = variant,
            None => self.variants.push(variant),
        }
    }

    /// Every declaration, in declaration order.
    pub fn declarations(&self) -> &[Variant] {
        &self.variants
    }

    pub fn declarations_of<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Variant> {
        self.variants.iter().filter(move |v| v.name == name)
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.variants.iter().any(|v| v.name == name)
    }

    /// Distinct variant names, in order of first declaration.
    pub fn variant_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for v in &self.variants {
            if !names.contains(&v.name.as_str()) {
                names.push(&v.name);
            }
        }
        names
    }
}

/// Two-phase declaration of a spec type or capability.
///
/// One builder per declaration; it is consumed by `build` or
/// `into_capability`.
pub struct SpecTypeBuilder {
    name: String,
    description: String,
    bases: Vec<Capability>,
    pending: Vec<Directive>,
    defaults: Vec<VariantOptions>,
}

impl SpecTypeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            bases: Vec::new(),
            pending: Vec::new(),
            defaults: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn describe(&mut self, text: impl Into<String>) -> &mut Self {
        self.description = text.into().trim().to_string();
        self
    }

    /// Inherit every directive of `capability`. Earlier-listed capabilities
    /// take precedence over later ones when both declare the same variant.
    pub fn inherit(&mut self, capability: &Capability) -> &mut Self {
        self.bases.push(capability.clone());
        self
    }

    /// Queue a custom directive. `dicts` is checked now, not at `build`.
    pub fn directive<F>(
        &mut self,
        name: &str,
        dicts: &[&str],
        apply: F,
    ) -> Result<&mut Self, DirectiveError>
    where
        F: Fn(&mut SpecTypeDescriptor) -> Result<(), DirectiveError> + Send + Sync + 'static,
    {
        if dicts.is_empty() {
            return Err(DirectiveError::NoDictionaries {
                directive: name.to_string(),
            });
        }
        if let Some(unknown) = dicts.iter().find(|d| !KNOWN_DICTIONARIES.contains(d)) {
            return Err(DirectiveError::UnknownDictionary {
                directive: name.to_string(),
                dict: unknown.to_string(),
            });
        }

        self.pending.push(Directive {
            name: name.to_string(),
            dicts: dicts.iter().map(|d| d.to_string()).collect(),
            apply: Arc::new(apply),
        });
        Ok(self)
    }

    /// Declare a variant. Active default-argument overlays fill in any
    /// argument not given explicitly; the topmost overlay wins.
    pub fn variant(&mut self, args: VariantArgs) -> Result<&mut Self, DirectiveError> {
        let overlay = self
            .defaults
            .iter()
            .rev()
            .fold(VariantOptions::default(), |acc, layer| acc.overlay(layer));
        let variant = Variant::define(&self.name, args.with_defaults(&overlay))?;

        self.directive("variant", &["variants"], move |descriptor| {
            descriptor.declare(variant.clone());
            Ok(())
        })
    }

    pub fn push_default_args(&mut self, options: VariantOptions) -> &mut Self {
        self.defaults.push(options);
        self
    }

    pub fn pop_default_args(&mut self) -> Result<VariantOptions, DirectiveError> {
        self.defaults
            .pop()
            .ok_or_else(|| DirectiveError::EmptyDefaultStack {
                owner: self.name.clone(),
            })
    }

    /// Run `body` with `options` pushed; the overlay is popped even when
    /// `body` fails.
    pub fn with_default_args<F>(
        &mut self,
        options: VariantOptions,
        body: F,
    ) -> Result<&mut Self, DirectiveError>
    where
        F: FnOnce(&mut Self) -> Result<(), DirectiveError>,
    {
        self.push_default_args(options);
        let result = body(self);
        self.pop_default_args()?;
        result?;
        Ok(self)
    }

    /// Inherited directives in application order: bases from last-listed to
    /// first-listed, each directive at most once, then our own.
    fn flush_order(&self) -> Vec<Directive> {
        let mut out: Vec<Directive> = Vec::new();
        for base in self.bases.iter().rev() {
            for directive in &base.directives {
                if !out.iter().any(|d| d.same_as(directive)) {
                    out.push(directive.clone());
                }
            }
        }
        out.extend(self.pending.iter().cloned());
        out
    }

    /// Apply every queued directive to a fresh descriptor.
    pub fn build(self) -> Result<SpecTypeDescriptor, DirectiveError> {
        let bases = self.bases.iter().map(|b| b.name.clone()).collect();
        let mut descriptor = SpecTypeDescriptor::empty(&self.name, &self.description, bases);

        let directives = self.flush_order();
        for directive in &directives {
            (directive.apply)(&mut descriptor)?;
        }

        debug!(
            spec_type = %descriptor.name,
            directives = directives.len(),
            variants = descriptor.variants.len(),
            "built spec type"
        );
        Ok(descriptor)
    }

    /// Freeze the queued directives, inherited ones included, into a
    /// capability other builders can inherit.
    pub fn into_capability(self) -> Capability {
        Capability {
            directives: self.flush_order(),
            name: self.name,
        }
    }
}
