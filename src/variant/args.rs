//! Arguments accepted by the `variant` directive.

use crate::variant::{GroupValidator, ValueSet, ValueType, Values};

/// Optional arguments of a variant declaration.
///
/// The same shape is used for default-argument overlays pushed on a builder:
/// explicit arguments win over the overlay.
#[derive(Clone, Default)]
pub struct VariantOptions {
    pub default: Option<String>,
    pub description: Option<String>,
    pub values: Option<Values>,
    pub multi: Option<bool>,
    pub validator: Option<GroupValidator>,
    pub when: Option<String>,
    pub sticky: Option<bool>,
}

impl VariantOptions {
    /// Fill every unset field from `under`.
    pub fn overlay(self, under: &VariantOptions) -> VariantOptions {
        VariantOptions {
            default: self.default.or_else(|| under.default.clone()),
            description: self.description.or_else(|| under.description.clone()),
            values: self.values.or_else(|| under.values.clone()),
            multi: self.multi.or(under.multi),
            validator: self.validator.or_else(|| under.validator.clone()),
            when: self.when.or_else(|| under.when.clone()),
            sticky: self.sticky.or(under.sticky),
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn when(mut self, condition: impl Into<String>) -> Self {
        self.when = Some(condition.into());
        self
    }

    pub fn sticky(mut self, sticky: bool) -> Self {
        self.sticky = Some(sticky);
        self
    }

    pub fn multi(mut self, multi: bool) -> Self {
        self.multi = Some(multi);
        self
    }
}

impl std::fmt::Debug for VariantOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariantOptions")
            .field("default", &self.default)
            .field("description", &self.description)
            .field("values", &self.values)
            .field("multi", &self.multi)
            .field("validator", &self.validator.as_ref().map(|_| "<fn>"))
            .field("when", &self.when)
            .field("sticky", &self.sticky)
            .finish()
    }
}

/// A complete `variant(...)` call: the name plus optional arguments.
#[derive(Debug, Clone)]
pub struct VariantArgs {
    pub name: String,
    pub options: VariantOptions,
}

impl VariantArgs {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: VariantOptions::default(),
        }
    }

    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.options.default = Some(value.into());
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.options.description = Some(text.into());
        self
    }

    /// Explicit set of allowed values.
    pub fn values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.values = Some(Values::explicit(values));
        self
    }

    /// Any value convertible to `ty`.
    pub fn of_type(mut self, ty: ValueType) -> Self {
        self.options.values = Some(Values::Typed(ty));
        self
    }

    /// Any value at all.
    pub fn any_value(mut self) -> Self {
        self.options.values = Some(Values::Any);
        self
    }

    /// Single-value predicate; `doc` describes accepted values for display.
    pub fn predicate(
        mut self,
        doc: impl Into<String>,
        check: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.options.values = Some(Values::predicate(doc, check));
        self
    }

    /// Value set carrying its own default, multiplicity and validator.
    pub fn value_set(mut self, set: ValueSet) -> Self {
        self.options.values = Some(Values::Set(set));
        self
    }

    pub fn multi(mut self, multi: bool) -> Self {
        self.options.multi = Some(multi);
        self
    }

    pub fn validator(
        mut self,
        validator: impl Fn(&str, &str, &[String]) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.options.validator = Some(std::sync::Arc::new(validator));
        self
    }

    pub fn when(mut self, condition: impl Into<String>) -> Self {
        self.options.when = Some(condition.into());
        self
    }

    pub fn sticky(mut self, sticky: bool) -> Self {
        self.options.sticky = Some(sticky);
        self
    }

    /// Fill unset arguments from a default-argument overlay.
    pub fn with_defaults(self, overlay: &VariantOptions) -> Self {
        Self {
            name: self.name,
            options: self.options.overlay(overlay),
        }
    }
}
