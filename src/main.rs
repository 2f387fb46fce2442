use anyhow::{Context, bail};
use benchpark_spec::repo::{builtin, manifest};
use benchpark_spec::scaling::{ScalingInput, ScalingPlan};
use benchpark_spec::spec::{SpecLike, SpecParser};
use benchpark_spec::view::{self, ConcreteSpecView, SpecTypeView, TokenView};
use benchpark_spec::{ObjectType, RepoPath, Spec};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "benchpark-spec")]
#[command(about = "Parse and concretize benchmark experiment and system specs", long_about = None)]
struct Cli {
    /// Repository manifest (JSON) searched before the built-in repository.
    #[arg(long = "repo", global = true)]
    repos: Vec<PathBuf>,

    /// Do not register the built-in experiments and systems.
    #[arg(long, global = true)]
    no_builtin: bool,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tokenize and parse spec strings without concretizing them.
    Parse {
        #[arg(required = true)]
        specs: Vec<String>,

        #[arg(long)]
        json: bool,
    },

    /// Experiment types.
    Experiment {
        #[command(subcommand)]
        cmd: ExperimentCommand,
    },

    /// System types.
    System {
        #[command(subcommand)]
        cmd: TypeCommand,
    },
}

#[derive(Subcommand)]
enum TypeCommand {
    /// List every known type.
    List,

    /// Show the variants a type declares.
    Info {
        /// Type name, optionally namespace-qualified.
        name: String,

        #[arg(long)]
        json: bool,
    },

    /// Concretize specs and print their canonical form.
    Show {
        #[arg(required = true)]
        specs: Vec<String>,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ExperimentCommand {
    #[command(flatten)]
    Common(TypeCommand),

    /// Scale problem variables using the spec's scaling variants.
    Scale {
        #[arg(required = true)]
        specs: Vec<String>,

        /// JSON file: { "scaling_variable": ..., "variables": [...] }
        #[arg(long)]
        variables: PathBuf,

        #[arg(long)]
        json: bool,
    },
}

fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Experiment and system search paths.
struct Repos {
    experiments: RepoPath,
    systems: RepoPath,
}

impl Repos {
    fn load(manifests: &[PathBuf], no_builtin: bool) -> Result<Self> {
        let caps = builtin::capabilities().context("define built-in capabilities")?;

        let mut experiments = RepoPath::new();
        let mut systems = RepoPath::new();
        if !no_builtin {
            let builtin_experiments =
                builtin::experiments(&caps).context("define built-in experiments")?;
            experiments.put_last(builtin_experiments);
            systems.put_last(builtin::systems().context("define built-in systems")?);
        }

        // Walk backwards so the first --repo ends up first on the path.
        for path in manifests.iter().rev() {
            let validated = manifest::load_manifest(path, &caps)?;
            experiments.put_first(validated.experiments);
            systems.put_first(validated.systems);
        }

        debug!(
            experiments = ?experiments.namespaces(),
            systems = ?systems.namespaces(),
            "repository search path"
        );
        Ok(Self {
            experiments,
            systems,
        })
    }

    fn path(&self, object_type: ObjectType) -> &RepoPath {
        match object_type {
            ObjectType::Experiment => &self.experiments,
            ObjectType::System => &self.systems,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_specs(args: &[String]) -> Result<Vec<Spec>> {
    let mut parser = SpecParser::from_args(args)?;
    let specs = parser.all_specs()?;
    if specs.is_empty() {
        bail!("no specs given");
    }
    Ok(specs)
}

fn concretize_all(args: &[String], repos: &RepoPath) -> Result<Vec<ConcreteSpecView>> {
    let mut views = Vec::new();
    for spec in parse_specs(args)? {
        let concrete = spec
            .concretize(repos)
            .with_context(|| format!("concretize '{}'", spec))?;
        views.push(ConcreteSpecView::from(&concrete));
    }
    Ok(views)
}

fn run_type_command(cmd: TypeCommand, object_type: ObjectType, repos: &RepoPath) -> Result<()> {
    match cmd {
        TypeCommand::List => {
            for (namespace, descriptor) in repos.all_types() {
                println!("{}.{}", namespace, descriptor.name);
            }
        }
        TypeCommand::Info { name, json } => {
            let spec = Spec::parse(&name).with_context(|| format!("parse type name '{}'", name))?;
            let Some(type_name) = spec.name() else {
                bail!("'{}' does not name a {}", name, object_type);
            };
            let namespace = match spec.namespace() {
                Some(ns) => ns.to_string(),
                None => repos.resolve_namespace(type_name)?,
            };
            let descriptor = repos.get(&namespace, type_name)?;
            let view = SpecTypeView::new(object_type, &namespace, &descriptor);
            if json {
                print_json(&view)?;
            } else {
                print!("{}", view.render_text());
            }
        }
        TypeCommand::Show { specs, json } => {
            let views = concretize_all(&specs, repos)?;
            if json {
                print_json(&views)?;
            } else {
                for v in &views {
                    print!("{}", view::render_concrete_text(v));
                }
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ParseOutput {
    tokens: Vec<TokenView>,
    specs: Vec<String>,
}

fn run_parse(args: &[String], json: bool) -> Result<()> {
    // 1) Tokenize the joined, re-quoted arguments.
    let mut parser = SpecParser::from_args(args)?;
    let tokens: Vec<TokenView> = parser.tokens().iter().map(TokenView::from).collect();

    // 2) Parse every spec.
    let specs: Vec<String> = parser
        .all_specs()?
        .iter()
        .map(ToString::to_string)
        .collect();

    if json {
        return print_json(&ParseOutput { tokens, specs });
    }
    for t in &tokens {
        println!("{:<28} {}", t.kind, t.value);
    }
    println!();
    for s in &specs {
        println!("{}", s);
    }
    Ok(())
}

fn run_scale(
    specs: &[String],
    variables: &Path,
    json: bool,
    repos: &RepoPath,
) -> Result<()> {
    let text = std::fs::read_to_string(variables)
        .with_context(|| format!("read scaling variables {}", variables.display()))?;
    let input: ScalingInput = serde_json::from_str(&text)
        .with_context(|| format!("parse scaling variables {}", variables.display()))?;

    for spec in parse_specs(specs)? {
        let concrete = spec
            .concretize(repos)
            .with_context(|| format!("concretize '{}'", spec))?;
        let plan = ScalingPlan::from_spec(&concrete)?;
        let scaled = plan.scale(&input)?;

        if json {
            print_json(&scaled)?;
        } else {
            println!("{}", concrete);
            print!("{}", view::render_scaled_text(&scaled));
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    match cli.cmd {
        Commands::Parse { specs, json } => run_parse(&specs, json)?,
        Commands::Experiment { cmd } => {
            let repos = Repos::load(&cli.repos, cli.no_builtin)?;
            let path = repos.path(ObjectType::Experiment);
            match cmd {
                ExperimentCommand::Common(cmd) => {
                    run_type_command(cmd, ObjectType::Experiment, path)?
                }
                ExperimentCommand::Scale {
                    specs,
                    variables,
                    json,
                } => run_scale(&specs, &variables, json, path)?,
            }
        }
        Commands::System { cmd } => {
            let repos = Repos::load(&cli.repos, cli.no_builtin)?;
            run_type_command(cmd, ObjectType::System, repos.path(ObjectType::System))?;
        }
    }

    Ok(())
}
