//! Concretization: abstract spec + declared variants -> concrete spec.
//!
//! Phases, each of which fails fast:
//!   1) resolve name, namespace and the owning type,
//!   2) reject variants the type never declares,
//!   3) adopt `when` conditions required by user-set conditional variants,
//!   4) back-fill defaults to a fixed point in declaration order,
//!   5) validate every assignment against its active declaration,
//!   6) freeze.

use crate::directive::SpecTypeDescriptor;
use crate::error::SpecError;
use crate::repo::RepoPath;
use crate::spec::{ConcreteSpec, Spec, SpecLike};
use crate::variant::{Variant, VariantMap};
use std::collections::VecDeque;
use tracing::debug;

pub struct Concretizer<'a> {
    repos: &'a RepoPath,
}

/// Is the `when` condition of a declaration met by `assigned`?
fn condition_met(assigned: &VariantMap, when: &Spec) -> bool {
    assigned.satisfies(when.variant_map())
}

impl<'a> Concretizer<'a> {
    pub fn new(repos: &'a RepoPath) -> Self {
        Self { repos }
    }

    pub fn concretize(&self, spec: &Spec) -> Result<ConcreteSpec, SpecError> {
        // 1) Owning type.
        let Some(name) = spec.name() else {
            return Err(SpecError::AnonymousSpec {
                spec: spec.to_string(),
            });
        };
        let namespace = match spec.namespace() {
            Some(ns) => ns.to_string(),
            None => self.repos.resolve_namespace(name)?,
        };
        let descriptor = self.repos.get(&namespace, name)?;
        let owner = format!("{namespace}.{name}");

        // 2) Unknown variants.
        let mut assigned = spec.variants().clone();
        if let Some(unknown) = assigned.names().find(|n| !descriptor.is_declared(n)) {
            return Err(SpecError::UnknownVariant {
                variant: unknown.to_string(),
                spec: owner,
            });
        }

        // 3) Conditions.
        resolve_conditions(&descriptor, &owner, &mut assigned)?;

        // 4) Defaults.
        backfill_defaults(&descriptor, &mut assigned)?;

        // 5) Validation.
        for (variant, values) in assigned.iter() {
            let declaration = active_declaration(&descriptor, variant, &assigned)
                .ok_or_else(|| unmet(&descriptor, variant, &owner))?;
            declaration.validate_values(&owner, values)?;
        }

        // 6) Freeze.
        let concrete = ConcreteSpec::new(name.to_string(), namespace, assigned);
        debug!(spec = %concrete, "concretized");
        Ok(concrete)
    }
}

/// First declaration of `variant` whose condition `assigned` meets.
fn active_declaration<'d>(
    descriptor: &'d SpecTypeDescriptor,
    variant: &str,
    assigned: &VariantMap,
) -> Option<&'d Variant> {
    descriptor
        .declarations_of(variant)
        .find(|d| condition_met(assigned, &d.when))
}

fn unmet(descriptor: &SpecTypeDescriptor, variant: &str, owner: &str) -> SpecError {
    let condition = descriptor
        .declarations_of(variant)
        .map(|d| d.when.to_string())
        .collect::<Vec<_>>()
        .join(" or ");
    SpecError::UnmetCondition {
        variant: variant.to_string(),
        spec: owner.to_string(),
        condition,
    }
}

/// For each assigned variant with no active declaration, adopt the condition
/// of the first declaration that accepts the assigned values and whose
/// condition neither contradicts existing assignments nor sets a sticky
/// variant. Variants set by an adopted condition are checked in turn.
fn resolve_conditions(
    descriptor: &SpecTypeDescriptor,
    owner: &str,
    assigned: &mut VariantMap,
) -> Result<(), SpecError> {
    let is_sticky = |name: &str| descriptor.declarations_of(name).any(|d| d.sticky);

    let mut pending: VecDeque<String> = assigned.names().map(str::to_string).collect();
    while let Some(variant) = pending.pop_front() {
        if active_declaration(descriptor, &variant, assigned).is_some() {
            continue;
        }

        let values = assigned.get(&variant).map(<[String]>::to_vec).unwrap_or_default();
        let adoptable = descriptor.declarations_of(&variant).find(|d| {
            d.validate_values_bool(owner, &values)
                && d.when.variant_map().iter().all(|(name, required)| {
                    match assigned.get(name) {
                        Some(current) => required.iter().all(|v| current.contains(v)),
                        None => !is_sticky(name) && descriptor.is_declared(name),
                    }
                })
        });
        let Some(declaration) = adoptable else {
            return Err(unmet(descriptor, &variant, owner));
        };

        for (name, values) in declaration.when.variant_map().iter() {
            if assigned.contains(name) {
                continue;
            }
            debug!(
                spec = owner,
                variant = %variant,
                condition = %declaration.when,
                "adopting condition for {name}"
            );
            assigned.insert(name, values.iter().cloned())?;
            pending.push_back(name.to_string());
        }
    }
    Ok(())
}

/// Assign defaults for every unassigned declaration whose condition holds,
/// repeating until a pass assigns nothing; a default can enable further
/// conditional declarations.
fn backfill_defaults(
    descriptor: &SpecTypeDescriptor,
    assigned: &mut VariantMap,
) -> Result<(), SpecError> {
    loop {
        let mut changed = false;
        for declaration in descriptor.declarations() {
            if assigned.contains(&declaration.name) || !condition_met(assigned, &declaration.when) {
                continue;
            }
            debug!(
                variant = %declaration.name,
                default = %declaration.default,
                "using default"
            );
            assigned.insert(&declaration.name, declaration.default_values())?;
            changed = true;
        }
        if !changed {
            return Ok(());
        }
    }
}

/// Concretize `spec` against `repos`.
pub fn concretize(spec: &Spec, repos: &RepoPath) -> Result<ConcreteSpec, SpecError> {
    Concretizer::new(repos).concretize(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::SpecTypeBuilder;
    use crate::repo::{ObjectType, Repository};
    use crate::variant::{VariantArgs, VariantOptions};
    use pretty_assertions::assert_eq;

    fn repos() -> RepoPath {
        let mut b = SpecTypeBuilder::new("gpu");
        b.variant(
            VariantArgs::new("backend")
                .default("cpu")
                .values(["cpu", "cuda", "rocm"]),
        )
        .unwrap()
        .variant(VariantArgs::new("pin").default("false").sticky(true))
        .unwrap()
        .variant(
            VariantArgs::new("arch")
                .default("sm_70")
                .values(["sm_70", "sm_80"])
                .when("backend=cuda"),
        )
        .unwrap()
        .variant(
            VariantArgs::new("arch")
                .default("gfx90a")
                .values(["gfx90a", "gfx942"])
                .when("backend=rocm"),
        )
        .unwrap()
        .with_default_args(VariantOptions::default().when("+pin"), |b| {
            b.variant(VariantArgs::new("cpuset").default("0"))?;
            Ok(())
        })
        .unwrap();

        let mut repo = Repository::new("test", ObjectType::Experiment);
        repo.add(b.build().unwrap());
        RepoPath::from_repos([repo])
    }

    fn concrete(text: &str) -> Result<ConcreteSpec, SpecError> {
        Spec::parse(text)?.concretize(&repos())
    }

    #[test]
    fn defaults_follow_conditions() {
        assert_eq!(concrete("gpu").unwrap().to_string(), "test.gpu~pin backend=cpu");
        assert_eq!(
            concrete("gpu backend=rocm").unwrap().to_string(),
            "test.gpu~pin arch=gfx90a backend=rocm"
        );
        assert_eq!(
            concrete("gpu +pin").unwrap().to_string(),
            "test.gpu+pin backend=cpu cpuset=0"
        );
    }

    #[test]
    fn conditional_assignment_adopts_its_condition() {
        let c = concrete("gpu arch=sm_80").unwrap();
        assert_eq!(c.value("backend"), Some("cuda"));
        assert_eq!(c.value("arch"), Some("sm_80"));
    }

    #[test]
    fn adopted_condition_comes_from_a_declaration_accepting_the_value() {
        let c = concrete("gpu arch=gfx90a").unwrap();
        assert_eq!(c.value("backend"), Some("rocm"));
        assert_eq!(c.to_string(), "test.gpu~pin arch=gfx90a backend=rocm");

        let err = concrete("gpu arch=tpu_v4").unwrap_err();
        assert!(matches!(err, SpecError::UnmetCondition { ref variant, .. } if variant == "arch"));

        let err = concrete("gpu backend=cuda arch=gfx90a").unwrap_err();
        assert!(matches!(err, SpecError::InvalidValues { .. }));
    }

    #[test]
    fn conflicting_condition_is_unmet() {
        let err = concrete("gpu backend=cpu arch=sm_80").unwrap_err();
        assert!(matches!(err, SpecError::UnmetCondition { ref variant, .. } if variant == "arch"));
    }

    #[test]
    fn sticky_variants_are_never_adopted() {
        let err = concrete("gpu cpuset=3").unwrap_err();
        assert!(matches!(
            err,
            SpecError::UnmetCondition { ref variant, .. } if variant == "cpuset"
        ));
        assert_eq!(concrete("gpu +pin cpuset=3").unwrap().value("cpuset"), Some("3"));
    }

    #[test]
    fn errors() {
        assert!(matches!(concrete("+pin"), Err(SpecError::AnonymousSpec { .. })));
        assert!(matches!(concrete("gpu +bogus"), Err(SpecError::UnknownVariant { .. })));
        assert!(matches!(concrete("gpu backend=tpu"), Err(SpecError::InvalidValues { .. })));
        assert!(matches!(concrete("cpu"), Err(SpecError::UnknownSpecType { .. })));
        assert!(matches!(concrete("other.gpu"), Err(SpecError::UnknownNamespace { .. })));
    }
}
