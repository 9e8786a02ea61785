use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use sdo_core::presets::{business_continuity_plan, business_continuity_templates};
use sdo_core::{
    KeywordCritic, NewSession, OfflineGenerator, Orchestrator, OrchestratorConfig, StoreConfig,
};
use sdo_kernel::dag::DependencyGraph;
use sdo_kernel::{DraftContext, WorkflowState, WorkflowStatus};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const RESUME_GUIDANCE: &str = "Address every open issue and mention each required keyword explicitly.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OnEscalation {
    Resume,
    Approve,
    Stop,
}

fn cli() -> Command {
    Command::new("sdo")
        .version(sdo_core::VERSION)
        .about("Section drafting orchestrator")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .subcommand(
            Command::new("simulate")
                .about("Draft the business continuity preset offline")
                .arg(
                    Arg::new("max-revisions")
                        .long("max-revisions")
                        .value_parser(value_parser!(u32))
                        .help("Automatic revisions per section before escalating"),
                )
                .arg(
                    Arg::new("on-escalation")
                        .long("on-escalation")
                        .default_value("resume")
                        .value_parser(["resume", "approve", "stop"])
                        .help("What the simulated human does when a section escalates"),
                )
                .arg(
                    Arg::new("checkpoint-dir")
                        .long("checkpoint-dir")
                        .value_parser(value_parser!(PathBuf))
                        .help("Persist checkpoints to this directory instead of memory"),
                )
                .arg(
                    Arg::new("context")
                        .long("context")
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON file with applicant_name, location and interview_transcript"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the final state as JSON"),
                ),
        )
        .subcommand(Command::new("graph").about("Print the preset's priority and dependency order"))
        .subcommand(Command::new("config").about("Print the effective configuration as TOML"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("simulate", args)) => {
            let mut config = load_config(args)?;
            if let Some(max) = args.get_one::<u32>("max-revisions") {
                config = config.with_max_revisions(*max);
            }
            if let Some(dir) = args.get_one::<PathBuf>("checkpoint-dir") {
                config = config.with_store(StoreConfig::file(dir));
            }
            let on_escalation = match args.get_one::<String>("on-escalation").map(String::as_str) {
                Some("approve") => OnEscalation::Approve,
                Some("stop") => OnEscalation::Stop,
                _ => OnEscalation::Resume,
            };
            let context = match args.get_one::<PathBuf>("context") {
                Some(path) => {
                    let raw = std::fs::read_to_string(path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    serde_json::from_str(&raw).context("parsing draft context")?
                }
                None => sample_context(),
            };

            let state = simulate(config, context, on_escalation).await?;
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                print_summary(&state);
            }
            if state.status == WorkflowStatus::Error {
                bail!(
                    "session ended in error: {}",
                    state.error_message.as_deref().unwrap_or("unknown")
                );
            }
        }
        Some(("graph", _)) => {
            let graph = DependencyGraph::new(&business_continuity_plan())?;
            println!("Priority order:");
            for (i, section) in graph.sections().iter().enumerate() {
                let deps: Vec<&str> = graph.dependencies(section)?.iter().map(|d| d.as_str()).collect();
                if deps.is_empty() {
                    println!("  {:>2}. {section}", i + 1);
                } else {
                    println!("  {:>2}. {section} <- {}", i + 1, deps.join(", "));
                }
            }
            println!();
            println!("Dependency order:");
            for (i, section) in graph.topological_order().iter().enumerate() {
                println!("  {:>2}. {section}", i + 1);
            }
        }
        Some(("config", args)) => {
            print!("{}", load_config(args)?.to_toml_string()?);
        }
        _ => unreachable!("subcommand_required"),
    }

    Ok(())
}

/// `--config` is global, so it lands in the subcommand's matches
fn load_config(args: &ArgMatches) -> anyhow::Result<OrchestratorConfig> {
    match args.get_one::<PathBuf>("config") {
        Some(path) => OrchestratorConfig::load(path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(OrchestratorConfig::default()),
    }
}

async fn simulate(
    config: OrchestratorConfig,
    context: DraftContext,
    on_escalation: OnEscalation,
) -> anyhow::Result<WorkflowState> {
    let store = config.store.open().await.context("opening session store")?;
    let orchestrator = Orchestrator::new(
        store,
        Arc::new(OfflineGenerator::new()),
        Arc::new(KeywordCritic::new()),
    )
    .with_templates(business_continuity_templates())
    .with_config(config);

    let plan = business_continuity_plan();
    let escalation_budget = plan.sections.len() * 3;
    let id = orchestrator
        .create_session(NewSession::new(context, plan))
        .await?;
    tracing::info!(session_id = %id, "simulating");

    let options = orchestrator.call_options();
    let cancel = options.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let mut state = orchestrator.run_until_suspended(&id, &options).await?;
    let mut escalations = 0;
    while state.status == WorkflowStatus::NeedsHuman && escalations < escalation_budget {
        escalations += 1;
        match on_escalation {
            OnEscalation::Resume => orchestrator.resume(&id, RESUME_GUIDANCE).await?,
            OnEscalation::Approve => orchestrator.approve(&id).await?,
            OnEscalation::Stop => break,
        };
        state = orchestrator.run_until_suspended(&id, &options).await?;
    }

    for (i, event) in orchestrator.transitions(&id).iter().enumerate() {
        println!(
            "{:>4}  {:<24} {:>11} -> {:<11} rc={}  {}",
            i + 1,
            event.section.as_ref().map_or("-", |s| s.as_str()),
            event.from.to_string(),
            event.to.to_string(),
            event.revision_count,
            event.detail
        );
    }
    if let Some(log) = orchestrator.transition_log(&id) {
        log.verify_integrity()
            .context("transition log failed verification")?;
    }

    Ok(state)
}

fn print_summary(state: &WorkflowState) {
    println!();
    println!("Session {}: {}", state.session_id, state.status);
    for section in &state.plan.sections {
        println!("  {:<24} {:?}", section.as_str(), state.section_status(section));
    }
    if let Some(current) = &state.current_section {
        println!("Escalated section: {current}");
        for (i, critique) in state.critique_list.iter().enumerate() {
            println!("  {}. {}", i + 1, critique.issue);
        }
    }
}

fn sample_context() -> DraftContext {
    DraftContext::new(
        "Test Manufacturing Co.",
        "Wakayama",
        "We machine metal parts for automotive suppliers with ten staff.\n\
         The plant sits in a tsunami inundation zone on the municipal hazard map.",
    )
    .with_extra("industry", "manufacturing")
}
