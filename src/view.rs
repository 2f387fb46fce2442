//! Serializable views of specs and spec types, plus plain-text rendering
//! for the CLI.

use crate::directive::SpecTypeDescriptor;
use crate::repo::ObjectType;
use crate::scaling::ScaledVariable;
use crate::spec::{ConcreteSpec, Token};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

#[derive(Debug, Clone, Serialize)]
pub struct TokenView {
    pub kind: String,
    pub value: String,
    pub start: usize,
    pub end: usize,
}

impl From<&Token> for TokenView {
    fn from(token: &Token) -> Self {
        Self {
            kind: token.kind.to_string(),
            value: token.value.clone(),
            start: token.start,
            end: token.end,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConcreteSpecView {
    pub spec: String,
    pub namespace: String,
    pub name: String,
    pub digest: String,
    pub variants: BTreeMap<String, Vec<String>>,
}

impl From<&ConcreteSpec> for ConcreteSpecView {
    fn from(spec: &ConcreteSpec) -> Self {
        Self {
            spec: spec.to_string(),
            namespace: spec.namespace().to_string(),
            name: spec.name().to_string(),
            digest: spec.digest(),
            variants: spec
                .variants()
                .iter()
                .map(|(name, values)| (name.to_string(), values.to_vec()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VariantView {
    pub name: String,
    pub default: String,
    pub description: String,
    pub allowed_values: String,
    pub multi: bool,
    pub sticky: bool,
    /// Empty for unconditional declarations.
    pub when: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpecTypeView {
    pub object_type: ObjectType,
    pub namespace: String,
    pub name: String,
    pub description: String,
    pub bases: Vec<String>,
    pub variants: Vec<VariantView>,
}

impl SpecTypeView {
    pub fn new(object_type: ObjectType, namespace: &str, descriptor: &SpecTypeDescriptor) -> Self {
        let variants = descriptor
            .declarations()
            .iter()
            .map(|v| VariantView {
                name: v.name.clone(),
                default: v.default.clone(),
                description: v.description.clone(),
                allowed_values: v.allowed_values(),
                multi: v.multi,
                sticky: v.sticky,
                when: v.when.to_string(),
            })
            .collect();

        Self {
            object_type,
            namespace: namespace.to_string(),
            name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            bases: descriptor.bases.clone(),
            variants,
        }
    }

    /// Human-readable `info` output.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} {}.{}", self.object_type, self.namespace, self.name);
        if !self.description.is_empty() {
            let _ = writeln!(out, "    {}", self.description);
        }
        if !self.bases.is_empty() {
            let _ = writeln!(out, "\nInherits: {}", self.bases.join(", "));
        }

        if self.variants.is_empty() {
            let _ = writeln!(out, "\nVariants: none");
            return out;
        }

        let _ = writeln!(out, "\nVariants:");
        let width = self
            .variants
            .iter()
            .map(|v| v.name.len())
            .max()
            .unwrap_or(0);
        for v in &self.variants {
            let mut flags = Vec::new();
            if v.multi {
                flags.push("multi".to_string());
            }
            if v.sticky {
                flags.push("sticky".to_string());
            }
            if !v.when.is_empty() {
                flags.push(format!("when {}", v.when));
            }
            let flags = if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags.join(", "))
            };

            let _ = writeln!(
                out,
                "    {:<width$}  [{}]  {}{}",
                v.name, v.default, v.allowed_values, flags
            );
            if !v.description.is_empty() {
                let _ = writeln!(out, "    {:<width$}  {}", "", v.description);
            }
        }
        out
    }
}

/// One line per concrete spec: canonical string, then digest and variants.
pub fn render_concrete_text(view: &ConcreteSpecView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", view.spec);
    let _ = writeln!(out, "    digest: {}", view.digest);
    for (name, values) in &view.variants {
        let _ = writeln!(out, "    {} = {}", name, values.join(","));
    }
    out
}

/// Scaled series as aligned columns, one row per variable.
pub fn render_scaled_text(variables: &[ScaledVariable]) -> String {
    let width = variables.iter().map(|v| v.name.len()).max().unwrap_or(0);
    let mut out = String::new();
    for v in variables {
        let values: Vec<String> = v.values.iter().map(|x| x.to_string()).collect();
        let _ = writeln!(out, "{:<width$}  {}", v.name, values.join(" "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::builtin;
    use crate::repo::RepoPath;
    use crate::spec::Spec;
    use pretty_assertions::assert_eq;

    #[test]
    fn concrete_view_carries_digest_and_variants() {
        let caps = builtin::capabilities().unwrap();
        let repos = RepoPath::from_repos([builtin::experiments(&caps).unwrap()]);
        let spec = Spec::parse("saxpy programming_model=cuda")
            .unwrap()
            .concretize(&repos)
            .unwrap();

        let view = ConcreteSpecView::from(&spec);
        assert_eq!(view.namespace, "builtin");
        assert_eq!(view.variants["programming_model"], vec!["cuda".to_string()]);
        assert_eq!(view.digest, spec.digest());

        let text = render_concrete_text(&view);
        assert!(text.starts_with("builtin.saxpy "));
        assert!(text.contains("    programming_model = cuda\n"));
    }

    #[test]
    fn info_text_lists_conditions() {
        let caps = builtin::capabilities().unwrap();
        let repo = builtin::experiments(&caps).unwrap();
        let kripke = repo.get("kripke").unwrap();
        let view = SpecTypeView::new(ObjectType::Experiment, "builtin", kripke);
        let text = view.render_text();
        assert!(text.starts_with("experiment builtin.kripke\n"));
        assert!(text.contains("[when cuda=oui]"));
        assert!(text.contains("Inherits: openmp, cuda, rocm"));
    }

    #[test]
    fn scaled_columns() {
        let text = render_scaled_text(&[
            ScaledVariable {
                name: "n".to_string(),
                values: vec![1, 2],
            },
            ScaledVariable {
                name: "px".to_string(),
                values: vec![4, 8],
            },
        ]);
        assert_eq!(text, "n   1 2\npx  4 8\n");
    }
}
