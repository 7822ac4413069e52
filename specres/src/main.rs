use clap::{Parser, Subcommand};
use miette::MietteHandlerOpts;
use specres_engine::{
    RegistrationError, Registry, ResolutionError, ResolutionReport, Resolver, ResolverConfig,
};
use std::process;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

mod scenarios;

use scenarios::{Scenario, SCENARIOS};

#[derive(Parser)]
#[command(
    name = "specres",
    version,
    about = "Specialization and overload resolution explorer",
    long_about = "Replays canned families of patterns and shows which one each use-site resolves to, and why."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Raise the log level (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available scenarios
    List,

    /// Declare scenarios and resolve their use-sites
    Demo {
        /// Scenarios to run (all when omitted)
        #[arg(value_name = "SCENARIO")]
        scenarios: Vec<String>,

        /// Leave ties between a pack and a non-pack candidate unordered
        #[arg(long)]
        no_pack_tie_break: bool,

        /// Leave ties between reference kinds and qualifications unordered
        #[arg(long)]
        no_qualification_tie_break: bool,

        /// Ignore qualification-adding conversions at the use-site
        #[arg(long)]
        no_conversion_avoidance: bool,

        /// Order every argument position, including defaulted ones the use-site left out
        #[arg(long)]
        all_positions: bool,

        /// Stop at the first ambiguous or unmatched use-site
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Debug, Error, miette::Diagnostic)]
enum CliError {
    #[error("Unknown scenario `{name}`")]
    #[diagnostic(
        code(specres::cli::unknown_scenario),
        help("Run `specres list` to see the available scenarios")
    )]
    UnknownScenario { name: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Resolution(#[from] ResolutionError),
}

fn main() {
    setup_miette_handler();

    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    match cli.command {
        Some(Commands::List) => handle_list_command(),
        Some(Commands::Demo {
            scenarios,
            no_pack_tie_break,
            no_qualification_tie_break,
            no_conversion_avoidance,
            all_positions,
            strict,
        }) => {
            let config = ResolverConfig::default()
                .with_pack_tie_break(!no_pack_tie_break)
                .with_qualification_tie_break(!no_qualification_tie_break)
                .with_conversion_avoidance(!no_conversion_avoidance)
                .with_supplied_arguments_only(!all_positions);
            if let Err(error) = handle_demo_command(&scenarios, config, strict) {
                eprintln!("{:?}", miette::Report::new(error));
                process::exit(1);
            }
        }
        None => {
            // No subcommand provided, show help
            Cli::parse_from(["specres", "--help"]);
        }
    }
}

/// Configure miette for error reporting
fn setup_miette_handler() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .color(true)
                .tab_width(4)
                .with_cause_chain()
                .build(),
        )
    }))
    .ok();
}

fn setup_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn handle_list_command() {
    for scenario in SCENARIOS {
        println!("{:<14} {}", scenario.name, scenario.summary);
    }
}

fn handle_demo_command(
    names: &[String],
    config: ResolverConfig,
    strict: bool,
) -> Result<(), CliError> {
    let selected: Vec<&Scenario> = if names.is_empty() {
        SCENARIOS.iter().collect()
    } else {
        names
            .iter()
            .map(|name| {
                scenarios::find(name).ok_or_else(|| CliError::UnknownScenario {
                    name: name.clone(),
                })
            })
            .collect::<Result<_, _>>()?
    };

    for (index, scenario) in selected.into_iter().enumerate() {
        if index > 0 {
            println!();
        }
        run_scenario(scenario, config, strict)?;
    }
    Ok(())
}

fn run_scenario(
    scenario: &Scenario,
    config: ResolverConfig,
    strict: bool,
) -> Result<(), CliError> {
    println!("== {}: {}", scenario.name, scenario.summary);

    let mut registry = Registry::default();
    let queries = (scenario.declare)(&mut registry)?;
    let snapshot = registry.freeze();
    tracing::debug!(
        scenario = scenario.name,
        patterns = snapshot.len(),
        queries = queries.len(),
        "declared scenario"
    );
    for (id, pattern) in snapshot.patterns() {
        println!("  {id} {}", pattern.signature());
    }

    let resolver = Resolver::with_config(snapshot.clone(), config);
    for query in &queries {
        let resolution = resolver.resolve(query);
        println!();
        print!("{}", ResolutionReport::new(&snapshot, query, &resolution));
        if strict {
            resolution.into_result(&snapshot, query)?;
        }
    }
    Ok(())
}
