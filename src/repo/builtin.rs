//! Built-in experiment and system types, namespace `builtin`.

use crate::directive::{Capability, SpecTypeBuilder};
use crate::error::DirectiveError;
use crate::repo::{ObjectType, Repository};
use crate::variant::{ValueSet, ValueType, VariantArgs, VariantOptions};
use std::collections::BTreeMap;

pub const NAMESPACE: &str = "builtin";

const CALIPER_MODES: [&str; 7] = [
    "time",
    "mpi",
    "cuda",
    "topdown-counters-all",
    "topdown-counters-toplevel",
    "topdown-all",
    "topdown-toplevel",
];

fn oui_non(name: &str, description: &str) -> VariantArgs {
    VariantArgs::new(name)
        .default("non")
        .values(["oui", "non"])
        .description(description)
}

/// Reusable capability bundles, by name.
pub fn capabilities() -> Result<BTreeMap<String, Capability>, DirectiveError> {
    let mut experiment = SpecTypeBuilder::new("experiment");
    experiment
        .variant(
            VariantArgs::new("scaling-factor")
                .default("2")
                .of_type(ValueType::Int)
                .description("Factor by which to scale values of problem variables"),
        )?
        .variant(
            VariantArgs::new("scaling-iterations")
                .default("4")
                .of_type(ValueType::Int)
                .description("Number of experiments to be generated"),
        )?;
    let experiment = experiment.into_capability();

    let mut openmp = SpecTypeBuilder::new("openmp");
    openmp
        .inherit(&experiment)
        .variant(oui_non("openmp", "Build and run with OpenMP"))?;

    let mut cuda = SpecTypeBuilder::new("cuda");
    cuda.variant(oui_non("cuda", "Build and run with CUDA"))?
        .with_default_args(VariantOptions::default().when("cuda=oui"), |b| {
            b.variant(
                VariantArgs::new("cuda_arch")
                    .default("none")
                    .description("CUDA compute capability to build for"),
            )?;
            Ok(())
        })?;

    let mut rocm = SpecTypeBuilder::new("rocm");
    rocm.variant(oui_non("rocm", "Build and run with ROCm"))?
        .with_default_args(VariantOptions::default().when("rocm=oui"), |b| {
            b.variant(
                VariantArgs::new("rocm_arch")
                    .default("none")
                    .description("AMD GPU target to build for"),
            )?;
            Ok(())
        })?;

    let mut caliper = SpecTypeBuilder::new("caliper");
    caliper.variant(
        VariantArgs::new("caliper")
            .value_set(ValueSet::any_combination_of(CALIPER_MODES))
            .description("caliper mode"),
    )?;

    let mut scaling = SpecTypeBuilder::new("scaling");
    scaling
        .variant(
            VariantArgs::new("strong-scaling-factor")
                .default("2")
                .of_type(ValueType::Int)
                .description("Strong-scaling factor (factor by which to increase resources)"),
        )?
        .variant(
            VariantArgs::new("strong-scaling-num-exprs")
                .default("4")
                .of_type(ValueType::Int)
                .description("Number of strong-scaling experiments"),
        )?
        .variant(
            VariantArgs::new("weak-scaling-factor")
                .default("2")
                .of_type(ValueType::Int)
                .description(
                    "Weak-scaling factor (factor by which to increase resources and problem sizes)",
                ),
        )?
        .variant(
            VariantArgs::new("weak-scaling-num-exprs")
                .default("4")
                .of_type(ValueType::Int)
                .description("Number of weak-scaling experiments"),
        )?;

    Ok([
        experiment,
        openmp.into_capability(),
        cuda.into_capability(),
        rocm.into_capability(),
        caliper.into_capability(),
        scaling.into_capability(),
    ]
    .into_iter()
    .map(|c| (c.name.clone(), c))
    .collect())
}

fn programming_model(description: &str) -> VariantArgs {
    VariantArgs::new("programming_model")
        .default("openmp")
        .values(["openmp", "cuda", "rocm"])
        .description(description)
}

/// Look up a capability that `capabilities()` always defines.
fn cap<'a>(
    caps: &'a BTreeMap<String, Capability>,
    name: &str,
) -> Result<&'a Capability, DirectiveError> {
    caps.get(name).ok_or_else(|| DirectiveError::Failed {
        owner: NAMESPACE.to_string(),
        directive: "inherit".to_string(),
        message: format!("unknown capability '{name}'"),
    })
}

pub fn experiments(caps: &BTreeMap<String, Capability>) -> Result<Repository, DirectiveError> {
    let mut repo = Repository::new(NAMESPACE, ObjectType::Experiment);

    let mut saxpy = SpecTypeBuilder::new("saxpy");
    saxpy
        .describe("Single-precision a*x plus y")
        .inherit(cap(caps, "experiment")?)
        .inherit(cap(caps, "caliper")?)
        .variant(programming_model("on-node parallelism model"))?;
    repo.add(saxpy.build()?);

    let mut amg = SpecTypeBuilder::new("amg2023");
    amg.describe("Algebraic multigrid solve on a structured problem")
        .inherit(cap(caps, "experiment")?)
        .inherit(cap(caps, "caliper")?)
        .variant(
            VariantArgs::new("workload")
                .default("problem1")
                .values(["problem1", "problem2"])
                .description("problem1 or problem2"),
        )?
        .variant(programming_model("on-node parallelism model"))?
        .variant(
            VariantArgs::new("scaling")
                .default("single-node")
                .values(["single-node", "weak", "strong", "throughput"])
                .description("Single node, weak scaling, strong scaling, or throughput study"),
        )?;
    repo.add(amg.build()?);

    let mut kripke = SpecTypeBuilder::new("kripke");
    kripke
        .describe("Deterministic particle transport proxy")
        .inherit(cap(caps, "openmp")?)
        .inherit(cap(caps, "cuda")?)
        .inherit(cap(caps, "rocm")?)
        .variant(programming_model("node-level parallelism model"))?
        .variant(
            VariantArgs::new("scaling")
                .default("single-node")
                .values(["single-node", "weak", "strong"])
                .description("Single node, weak scaling, or strong scaling study"),
        )?;
    repo.add(kripke.build()?);

    let mut quicksilver = SpecTypeBuilder::new("quicksilver");
    quicksilver
        .describe("Monte Carlo transport proxy")
        .inherit(cap(caps, "openmp")?)
        .inherit(cap(caps, "scaling")?)
        .variant(
            VariantArgs::new("experiment")
                .default("weak")
                .values(["weak", "strong"])
                .description("weak or strong scaling"),
        )?;
    repo.add(quicksilver.build()?);

    let mut hpl = SpecTypeBuilder::new("hpl");
    hpl.describe("High-Performance Linpack")
        .inherit(cap(caps, "experiment")?)
        .inherit(cap(caps, "caliper")?)
        .variant(
            VariantArgs::new("programming_model")
                .default("openmp")
                .values(["openmp"])
                .description("on-node parallelism model"),
        )?
        .variant(
            VariantArgs::new("workload")
                .default("standard")
                .description("standard"),
        )?
        .variant(
            VariantArgs::new("experiment")
                .default("example")
                .values(["example"])
                .description("type of experiment"),
        )?;
    repo.add(hpl.build()?);

    Ok(repo)
}

fn compiler(default: &str, values: &[&str]) -> VariantArgs {
    VariantArgs::new("compiler")
        .default(default)
        .values(values.iter().copied())
        .description("Which compiler to use")
}

fn cuda_version() -> VariantArgs {
    VariantArgs::new("cuda")
        .default("11-8-0")
        .values(["11-8-0", "10-1-243"])
        .description("CUDA version")
}

pub fn systems() -> Result<Repository, DirectiveError> {
    let mut repo = Repository::new(NAMESPACE, ObjectType::System);

    let mut aws = SpecTypeBuilder::new("aws");
    aws.describe("AWS ParallelCluster instance").variant(
        VariantArgs::new("instance_type")
            .values(["c6g.xlarge", "c4.xlarge"])
            .default("c4.xlarge")
            .description("AWS instance type"),
    )?;
    repo.add(aws.build()?);

    let mut cts = SpecTypeBuilder::new("cts");
    cts.describe("LLNL commodity technology systems")
        .variant(
            VariantArgs::new("cluster")
                .default("ruby")
                .values(["ruby", "magma", "dane"])
                .description("Which cluster to run on"),
        )?
        .variant(compiler("gcc", &["gcc", "intel"]))?;
    repo.add(cts.build()?);

    let ibm_compilers = ["clang-ibm", "xl", "xl-gcc", "clang"];
    for (name, description) in [
        ("lassen", "LLNL IBM Power9 + V100 system"),
        ("sierra", "LLNL IBM Power9 + V100 system"),
    ] {
        let mut system = SpecTypeBuilder::new(name);
        system
            .describe(description)
            .variant(cuda_version())?
            .variant(compiler("clang-ibm", &ibm_compilers))?;
        repo.add(system.build()?);
    }

    let mut x86 = SpecTypeBuilder::new("x86_64");
    x86.describe("Generic x86_64 node")
        .variant(compiler("gcc", &["gcc", "intel"]))?;
    repo.add(x86.build()?);

    let mut generic = SpecTypeBuilder::new("genericx86");
    generic.describe("Generic x86 system with gcc and MPI");
    repo.add(generic.build()?);

    let mut tioga = SpecTypeBuilder::new("tioga");
    tioga.describe("LLNL AMD MI250X system, flux scheduler");
    repo.add(tioga.build()?);

    Ok(repo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_experiments() {
        let caps = capabilities().unwrap();
        let repo = experiments(&caps).unwrap();
        assert_eq!(
            repo.names().collect::<Vec<_>>(),
            vec!["amg2023", "hpl", "kripke", "quicksilver", "saxpy"]
        );

        let saxpy = repo.get("saxpy").unwrap();
        assert_eq!(
            saxpy.variant_names(),
            vec!["caliper", "scaling-factor", "scaling-iterations", "programming_model"]
        );
        assert_eq!(saxpy.bases, vec!["experiment".to_string(), "caliper".to_string()]);
    }

    #[test]
    fn openmp_inherits_experiment_once() {
        let caps = capabilities().unwrap();
        let repo = experiments(&caps).unwrap();
        let kripke = repo.get("kripke").unwrap();
        assert_eq!(kripke.declarations_of("scaling-factor").count(), 1);
        assert!(kripke.declarations_of("cuda_arch").all(|v| v.is_conditional()));
    }

    #[test]
    fn builtin_systems() {
        let repo = systems().unwrap();
        assert_eq!(repo.len(), 7);
        let lassen = repo.get("lassen").unwrap();
        let compiler = lassen.declarations_of("compiler").next().unwrap();
        assert_eq!(compiler.default, "clang-ibm");
        assert!(repo.get("genericx86").unwrap().declarations().is_empty());
    }
}
