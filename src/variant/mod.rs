//! Variant model: one configurable axis of a spec type.
//!
//! A variant has a name, a default, a value domain, a multiplicity and an
//! optional group validator. Variants are created by the `variant`
//! directive (see `directive`) and never change afterwards; concretization
//! only reads them.

pub mod args;
pub mod map;

pub use args::{VariantArgs, VariantOptions};
pub use map::{FrozenVariantMap, VariantMap};

use crate::error::{DirectiveError, SpecError};
use crate::spec::Spec;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Value accepted by every validator.
pub const WILDCARD: &str = "*";

/// Single-value predicate.
pub type ValuePredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Validator over the whole tuple of assigned values.
///
/// Receives the owning type name, the variant name and the values.
pub type GroupValidator = Arc<dyn Fn(&str, &str, &[String]) -> Result<(), String> + Send + Sync>;

/// Scalar types a value may be required to convert to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Int,
    Float,
    Bool,
}

impl ValueType {
    pub fn accepts(self, value: &str) -> bool {
        let value = value.trim();
        match self {
            ValueType::Int => value.parse::<i64>().is_ok(),
            ValueType::Float => value.parse::<f64>().is_ok(),
            ValueType::Bool => {
                value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false")
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Bool => "bool",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "int" => Some(ValueType::Int),
            "float" => Some(ValueType::Float),
            "bool" => Some(ValueType::Bool),
            _ => None,
        }
    }
}

/// A set of allowed values that brings its own declaration defaults.
#[derive(Clone)]
pub struct ValueSet {
    pub values: Vec<String>,
    pub default: Option<String>,
    pub multi: Option<bool>,
    pub validator: Option<GroupValidator>,
}

impl ValueSet {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            default: None,
            multi: None,
            validator: None,
        }
    }

    /// Any combination of `values`, or the single value `none`.
    pub fn any_combination_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut all = vec!["none".to_string()];
        all.extend(values.into_iter().map(Into::into));

        let validator: GroupValidator = Arc::new(|_owner, _variant, values: &[String]| {
            if values.len() > 1 && values.iter().any(|v| v == "none") {
                return Err("'none' cannot be combined with other values".to_string());
            }
            Ok(())
        });

        Self {
            values: all,
            default: Some("none".to_string()),
            multi: Some(true),
            validator: Some(validator),
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_multi(mut self, multi: bool) -> Self {
        self.multi = Some(multi);
        self
    }
}

impl fmt::Debug for ValueSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueSet")
            .field("values", &self.values)
            .field("default", &self.default)
            .field("multi", &self.multi)
            .field("validator", &self.validator.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// The `values` argument of a declaration.
#[derive(Clone)]
pub enum Values {
    /// `"*"`: any value.
    Any,
    Typed(ValueType),
    Predicate { doc: String, check: ValuePredicate },
    Explicit(Vec<String>),
    Set(ValueSet),
}

impl Values {
    pub fn explicit<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Values::Explicit(values.into_iter().map(Into::into).collect())
    }

    pub fn predicate(
        doc: impl Into<String>,
        check: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        Values::Predicate {
            doc: doc.into(),
            check: Arc::new(check),
        }
    }
}

impl fmt::Debug for Values {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Values::Any => f.write_str("Any"),
            Values::Typed(ty) => f.debug_tuple("Typed").field(ty).finish(),
            Values::Predicate { doc, .. } => f.debug_struct("Predicate").field("doc", doc).finish(),
            Values::Explicit(values) => f.debug_tuple("Explicit").field(values).finish(),
            Values::Set(set) => f.debug_tuple("Set").field(set).finish(),
        }
    }
}

/// Resolved value domain of a declared variant.
#[derive(Clone)]
pub enum Domain {
    Any,
    Typed(ValueType),
    Predicate { doc: String, check: ValuePredicate },
    Explicit(Vec<String>),
}

impl Domain {
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            Domain::Any => true,
            Domain::Typed(ty) => ty.accepts(value),
            Domain::Predicate { check, .. } => check(value),
            Domain::Explicit(values) => values.iter().any(|v| v == value),
        }
    }

    /// Explicit values, if the domain enumerates them.
    pub fn explicit(&self) -> Option<&[String]> {
        match self {
            Domain::Explicit(values) => Some(values),
            _ => None,
        }
    }
}

impl fmt::Debug for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Any => f.write_str("Any"),
            Domain::Typed(ty) => f.debug_tuple("Typed").field(ty).finish(),
            Domain::Predicate { doc, .. } => f.debug_struct("Predicate").field("doc", doc).finish(),
            Domain::Explicit(values) => f.debug_tuple("Explicit").field(values).finish(),
        }
    }
}

/// A declared variant.
#[derive(Clone)]
pub struct Variant {
    pub name: String,
    pub default: String,
    pub description: String,
    pub domain: Domain,
    pub multi: bool,
    pub validator: Option<GroupValidator>,
    pub sticky: bool,
    /// Condition on other assignments under which the variant applies.
    pub when: Spec,
}

impl Variant {
    /// Build a variant from a `variant(...)` call made on behalf of `owner`.
    pub fn define(owner: &str, args: VariantArgs) -> Result<Variant, DirectiveError> {
        let VariantArgs { name, options } = args;

        static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
        let pattern = format!("^{}$", crate::spec::lexer::IDENTIFIER);
        let identifier = crate::spec::lexer::cached_regex(&IDENTIFIER, &pattern)
            .map_err(|e| DirectiveError::Failed {
                owner: owner.to_string(),
                directive: "variant".to_string(),
                message: e.to_string(),
            })?;
        if !identifier.is_match(&name) {
            return Err(DirectiveError::InvalidName {
                owner: owner.to_string(),
                name,
            });
        }

        let mut default = options.default;
        let mut multi = options.multi;
        let mut validator = options.validator;

        let values = match options.values {
            Some(values) => values,
            None => match default.as_deref() {
                Some(d) if ValueType::Bool.accepts(d) => Values::Typed(ValueType::Bool),
                _ => Values::Any,
            },
        };

        let domain = match values {
            Values::Any => Domain::Any,
            Values::Typed(ty) => Domain::Typed(ty),
            Values::Predicate { doc, check } => Domain::Predicate { doc, check },
            Values::Explicit(values) => Domain::Explicit(values),
            Values::Set(set) => {
                let conflict = |argument| DirectiveError::ConflictingArgument {
                    owner: owner.to_string(),
                    name: name.clone(),
                    argument,
                };
                if set.default.is_some() && default.is_some() {
                    return Err(conflict("default"));
                }
                if set.multi.is_some() && multi.is_some() {
                    return Err(conflict("multi"));
                }
                if set.validator.is_some() && validator.is_some() {
                    return Err(conflict("validator"));
                }
                default = set.default.or(default);
                multi = set.multi.or(multi);
                validator = set.validator.or(validator);
                Domain::Explicit(set.values)
            }
        };

        let default = match default {
            None => {
                return Err(DirectiveError::MissingDefault {
                    owner: owner.to_string(),
                    name,
                    reason: "either a default was not explicitly set, or 'None' was used",
                });
            }
            Some(d) if d.is_empty() => {
                return Err(DirectiveError::MissingDefault {
                    owner: owner.to_string(),
                    name,
                    reason: "the default cannot be an empty string",
                });
            }
            Some(d) => d,
        };

        let when = match options.when.as_deref() {
            None => Spec::default(),
            Some(text) => Spec::parse(text).map_err(|e| DirectiveError::InvalidCondition {
                owner: owner.to_string(),
                name: name.clone(),
                source: Box::new(e),
            })?,
        };

        Ok(Variant {
            name,
            default,
            description: options.description.unwrap_or_default().trim().to_string(),
            domain,
            multi: multi.unwrap_or(false),
            validator,
            sticky: options.sticky.unwrap_or(false),
            when,
        })
    }

    /// Default split into values: multi-valued defaults may list several.
    pub fn default_values(&self) -> Vec<String> {
        if self.multi {
            self.default.split(',').map(str::to_string).collect()
        } else {
            vec![self.default.clone()]
        }
    }

    /// Check an assigned tuple of values against this variant.
    ///
    /// Multiplicity is checked first, then each value except the wildcard;
    /// all rejected values are reported together. The group validator runs
    /// last.
    pub fn validate_values(&self, owner: &str, values: &[String]) -> Result<(), SpecError> {
        if !self.multi && values.len() != 1 {
            return Err(SpecError::MultipleValues {
                owner: owner.to_string(),
                variant: self.name.clone(),
                count: values.len(),
            });
        }

        let not_allowed: Vec<String> = values
            .iter()
            .filter(|v| v.as_str() != WILDCARD && !self.domain.accepts(v))
            .cloned()
            .collect();
        if !not_allowed.is_empty() {
            return Err(SpecError::InvalidValues {
                owner: owner.to_string(),
                variant: self.name.clone(),
                values: not_allowed,
            });
        }

        if let Some(validator) = &self.validator {
            validator(owner, &self.name, values).map_err(|message| SpecError::GroupValidation {
                owner: owner.to_string(),
                variant: self.name.clone(),
                message,
            })?;
        }

        Ok(())
    }

    pub fn validate_values_bool(&self, owner: &str, values: &[String]) -> bool {
        self.validate_values(owner, values).is_ok()
    }

    /// Human readable description of the allowed values.
    pub fn allowed_values(&self) -> String {
        match &self.domain {
            Domain::Any => WILDCARD.to_string(),
            Domain::Typed(ty) => format!("any {}", ty.name()),
            Domain::Predicate { doc, .. } => doc.clone(),
            Domain::Explicit(values) => values.join(", "),
        }
    }

    pub fn is_conditional(&self) -> bool {
        !self.when.is_unconstrained()
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variant")
            .field("name", &self.name)
            .field("default", &self.default)
            .field("domain", &self.domain)
            .field("multi", &self.multi)
            .field("sticky", &self.sticky)
            .field("when", &self.when.to_string())
            .finish()
    }
}
