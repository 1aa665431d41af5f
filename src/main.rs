use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ractor::Actor;
use serde_json::Value;
use std::path::PathBuf;
use tokio::sync::oneshot;

use case_engine::case_trace::CaseTrace;
use case_engine::config::EngineConfig;
use case_engine::definition::load_case_definition;
use case_engine::domain::{
    create_actor_args, CaseActor, CaseCommand, CaseFileInput, CaseFilePath, CaseId, CaseMessage,
    CaseRoleName, CaseView, PlanItemId, UserId,
};
use case_engine::engine_paths::{self, CaseInfo};
use case_engine::instance::plan_item::{PlanItemKind, Transition};

#[derive(Parser)]
#[command(name = "case-engine")]
#[command(about = "Event-sourced case management engine driven by CMMN-style definitions")]
#[command(version)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Acting user id (falls back to default_user from the engine config)
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new case from a definition
    Start {
        /// Definition file path, or a bare name resolved in the definitions directory
        definition: String,

        /// Case name (defaults to the definition name)
        #[arg(short, long)]
        name: Option<String>,

        /// Initial case file content as path=json pairs, e.g. order='{"id": 7}'
        #[arg(short, long)]
        input: Vec<String>,
    },

    /// Apply a lifecycle transition to the case plan root
    Transition {
        /// Case id or name (partial match allowed)
        case: String,

        /// Transition to apply: suspend, reactivate, complete, terminate, ...
        transition: String,
    },

    /// Apply a lifecycle transition to one plan item
    PlanItem {
        /// Case id or name (partial match allowed)
        case: String,

        /// Plan item id (see `show`)
        plan_item: String,

        /// Transition to apply: start, complete, suspend, resume, ...
        transition: String,
    },

    /// Create, update, replace, or delete a case file item
    CaseFile {
        /// Case id or name (partial match allowed)
        case: String,

        #[command(subcommand)]
        operation: CaseFileOp,
    },

    /// Manage the case team
    Team {
        /// Case id or name (partial match allowed)
        case: String,

        #[command(subcommand)]
        operation: TeamOp,
    },

    /// Migrate a running case to a new definition version
    Migrate {
        /// Case id or name (partial match allowed)
        case: String,

        /// New definition file path, or a bare name resolved in the definitions directory
        definition: String,
    },

    /// Show the current state of a case
    Show {
        /// Case id or name (partial match allowed)
        case: String,
    },

    /// List known cases, most recent first
    List,
}

#[derive(Subcommand)]
enum CaseFileOp {
    /// Create an item with an initial value
    Create {
        /// Item path, e.g. order or order/lines
        path: String,
        /// JSON value
        value: String,
    },
    /// Merge new content into an existing item
    Update {
        path: String,
        /// JSON value
        value: String,
    },
    /// Replace the content of an existing item
    Replace {
        path: String,
        /// JSON value
        value: String,
    },
    /// Delete an item and its descendants
    Delete { path: String },
}

#[derive(Subcommand)]
enum TeamOp {
    /// Add a member or change their roles
    Set {
        /// Member user id
        member: String,
        /// Case role granted to the member (repeatable)
        #[arg(short, long)]
        role: Vec<String>,
    },
    /// Remove a member
    Remove {
        /// Member user id
        member: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = EngineConfig::load_or_default()?;

    match cli.command {
        Commands::Start {
            definition,
            name,
            input,
        } => run_start(&definition, name, &input, cli.user, &config).await,

        Commands::Transition { case, transition } => {
            let user = resolve_user(cli.user, &config)?;
            let transition = parse_transition(&transition)?;
            run_case_command(&case, CaseCommand::MakeCaseTransition { user, transition }, &config)
                .await
        }

        Commands::PlanItem {
            case,
            plan_item,
            transition,
        } => {
            let user = resolve_user(cli.user, &config)?;
            let transition = parse_transition(&transition)?;
            let command = CaseCommand::MakePlanItemTransition {
                user,
                plan_item_id: PlanItemId::from(plan_item),
                transition,
            };
            run_case_command(&case, command, &config).await
        }

        Commands::CaseFile { case, operation } => {
            let user = resolve_user(cli.user, &config)?;
            let command = match operation {
                CaseFileOp::Create { path, value } => CaseCommand::CreateCaseFileItem {
                    user,
                    path: CaseFilePath::from(path),
                    value: parse_json_value(&value)?,
                },
                CaseFileOp::Update { path, value } => CaseCommand::UpdateCaseFileItem {
                    user,
                    path: CaseFilePath::from(path),
                    value: parse_json_value(&value)?,
                },
                CaseFileOp::Replace { path, value } => CaseCommand::ReplaceCaseFileItem {
                    user,
                    path: CaseFilePath::from(path),
                    value: parse_json_value(&value)?,
                },
                CaseFileOp::Delete { path } => CaseCommand::DeleteCaseFileItem {
                    user,
                    path: CaseFilePath::from(path),
                },
            };
            run_case_command(&case, command, &config).await
        }

        Commands::Team { case, operation } => {
            let user = resolve_user(cli.user, &config)?;
            let command = match operation {
                TeamOp::Set { member, role } => CaseCommand::SetTeamMember {
                    user,
                    member_id: UserId::from(member),
                    case_roles: role.into_iter().map(CaseRoleName::from).collect(),
                },
                TeamOp::Remove { member } => CaseCommand::RemoveTeamMember {
                    user,
                    member_id: UserId::from(member),
                },
            };
            run_case_command(&case, command, &config).await
        }

        Commands::Migrate { case, definition } => {
            let user = resolve_user(cli.user, &config)?;
            let path = resolve_definition_path(&definition, &config)?;
            let new_definition = load_case_definition(&path)?;
            eprintln!(
                "[case-engine] Migrating to definition '{}' [{}]",
                new_definition.name,
                new_definition.fingerprint()
            );
            let command = CaseCommand::MigrateDefinition {
                user,
                new_definition,
            };
            run_case_command(&case, command, &config).await
        }

        Commands::Show { case } => run_show(&case, &config).await,

        Commands::List => run_list(),
    }
}

async fn run_start(
    definition_arg: &str,
    name: Option<String>,
    inputs: &[String],
    user_arg: Option<String>,
    config: &EngineConfig,
) -> Result<()> {
    let user = resolve_user(user_arg, config)?;
    let path = resolve_definition_path(definition_arg, config)?;
    let definition = load_case_definition(&path)?;
    eprintln!(
        "[case-engine] Starting case from definition '{}' [{}]",
        definition.name,
        definition.fingerprint()
    );

    let case_id = CaseId::new().to_string();
    let case_name = name.unwrap_or_else(|| definition.name.clone());
    let definition_name = definition.name.clone();
    let parsed_inputs = inputs
        .iter()
        .map(|raw| parse_case_file_input(raw))
        .collect::<Result<Vec<_>>>()?;

    let command = CaseCommand::StartCase {
        case_name: case_name.clone(),
        definition,
        inputs: parsed_inputs,
        created_by: user.clone(),
    };

    let view = dispatch_command(&case_id, command, config).await?;

    let mut info = CaseInfo::new(&case_id, &case_name, &definition_name, user.as_str());
    if let Some(state) = view.case_state() {
        info.update(&state.to_string());
    }
    info.save()?;

    println!("Started case '{}' ({})", case_name, case_id);
    print_view(&view);
    Ok(())
}

/// Resolves the case, dispatches the command, and records the new case state.
async fn run_case_command(
    pattern: &str,
    command: CaseCommand,
    config: &EngineConfig,
) -> Result<()> {
    let mut info = resolve_case(pattern)?;
    let view = dispatch_command(&info.case_id, command, config).await?;

    if let Some(state) = view.case_state() {
        info.update(&state.to_string());
        info.save()?;
    }

    print_view(&view);
    Ok(())
}

/// Spawns the case actor, sends one command, and returns the resulting view.
///
/// The actor rehydrates the aggregate from the event log before handling the
/// command, so every invocation sees the full case history.
async fn dispatch_command(
    case_id: &str,
    command: CaseCommand,
    config: &EngineConfig,
) -> Result<CaseView> {
    let trace = CaseTrace::new(case_id, &engine_paths::case_trace_path(case_id)?)?;
    trace.log_command(&command);

    let (args, _snapshot_rx, _event_rx) = create_actor_args(case_id, config)?;
    let (actor, handle) = Actor::spawn(None, CaseActor, args)
        .await
        .context("Failed to start case actor")?;

    let (reply_tx, reply_rx) = oneshot::channel();
    if let Err(e) = actor.send_message(CaseMessage::Command(Box::new(command), reply_tx)) {
        actor.stop(None);
        let _ = handle.await;
        anyhow::bail!("Failed to send command to case actor: {}", e);
    }

    let result = reply_rx.await;
    actor.stop(None);
    let _ = handle.await;

    match result {
        Ok(Ok(view)) => {
            let state = view
                .case_state()
                .map(|state| state.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            trace.log_command_accepted(&state);
            Ok(view)
        }
        Ok(Err(err)) => {
            trace.log_command_rejected(&err.to_string());
            Err(err.into())
        }
        Err(_) => anyhow::bail!("Case actor dropped the command reply"),
    }
}

async fn run_show(pattern: &str, config: &EngineConfig) -> Result<()> {
    let info = resolve_case(pattern)?;

    let (args, _snapshot_rx, _event_rx) = create_actor_args(&info.case_id, config)?;
    let (actor, handle) = Actor::spawn(None, CaseActor, args)
        .await
        .context("Failed to start case actor")?;

    let (reply_tx, reply_rx) = oneshot::channel();
    if let Err(e) = actor.send_message(CaseMessage::GetView(reply_tx)) {
        actor.stop(None);
        let _ = handle.await;
        anyhow::bail!("Failed to query case actor: {}", e);
    }

    let view = reply_rx.await;
    actor.stop(None);
    let _ = handle.await;

    let view = view.context("Case actor dropped the view reply")?;
    print_view(&view);
    Ok(())
}

fn run_list() -> Result<()> {
    let cases = engine_paths::list_cases()?;
    if cases.is_empty() {
        println!("No cases found.");
        return Ok(());
    }

    for case in cases {
        println!(
            "{}  {:<10}  {}  (definition: {}, started by {} at {})",
            case.case_id,
            case.state,
            case.case_name,
            case.definition_name,
            case.created_by,
            case.created_at
        );
    }
    Ok(())
}

fn resolve_user(argument: Option<String>, config: &EngineConfig) -> Result<UserId> {
    argument
        .or_else(|| config.default_user.clone())
        .map(UserId::from)
        .context("No user given; pass --user or set default_user in the engine config")
}

fn resolve_case(pattern: &str) -> Result<CaseInfo> {
    engine_paths::find_case(pattern)?
        .with_context(|| format!("No case matches '{}'; run `case-engine list`", pattern))
}

fn resolve_definition_path(argument: &str, config: &EngineConfig) -> Result<PathBuf> {
    let direct = PathBuf::from(argument);
    if direct.exists() {
        return Ok(direct);
    }

    let dir = match &config.definitions_dir {
        Some(dir) => dir.clone(),
        None => engine_paths::definitions_dir()?,
    };
    for candidate in [
        dir.join(argument),
        dir.join(format!("{argument}.yaml")),
        dir.join(format!("{argument}.yml")),
    ] {
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    anyhow::bail!(
        "Definition not found: {} (searched {})",
        argument,
        dir.display()
    )
}

fn parse_transition(raw: &str) -> Result<Transition> {
    serde_yaml::from_str(raw).with_context(|| format!("Unknown transition '{}'", raw))
}

fn parse_json_value(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("Invalid JSON value: {}", raw))
}

fn parse_case_file_input(raw: &str) -> Result<CaseFileInput> {
    let (path, value) = raw
        .split_once('=')
        .with_context(|| format!("Expected path=json, got '{}'", raw))?;
    Ok(CaseFileInput {
        path: CaseFilePath::from(path),
        value: parse_json_value(value)?,
    })
}

fn print_view(view: &CaseView) {
    match (view.case_name(), view.case_id()) {
        (Some(name), Some(id)) => println!("Case: {} ({})", name, id),
        (Some(name), None) => println!("Case: {}", name),
        _ => {}
    }
    if let Some(definition) = view.definition_name() {
        let fingerprint = view.definition_fingerprint().unwrap_or("-");
        println!("Definition: {} [{}]", definition, fingerprint);
    }
    if let Some(state) = view.case_state() {
        println!("State: {}", state);
    }

    if !view.plan_items().is_empty() {
        println!();
        println!("Plan items:");
        print_plan_subtree(view, None, 1);
    }

    if !view.case_file().is_empty() {
        println!();
        println!("Case file:");
        for (path, item) in view.case_file() {
            let value = serde_json::to_string(&item.value).unwrap_or_else(|_| "null".to_string());
            println!("  /{} = {} (last: {})", path, value, item.last_transition);
        }
    }

    if !view.team().is_empty() {
        println!();
        println!("Team:");
        for (member, roles) in view.team() {
            if roles.is_empty() {
                println!("  {}", member);
            } else {
                let roles: Vec<&str> = roles.iter().map(|role| role.as_str()).collect();
                println!("  {} ({})", member, roles.join(", "));
            }
        }
    }
}

/// Prints the plan item tree under one parent, stages recursing into children.
fn print_plan_subtree(view: &CaseView, parent: Option<&PlanItemId>, depth: usize) {
    let mut children: Vec<_> = view
        .plan_items()
        .iter()
        .filter(|(_, item)| item.stage.as_ref() == parent)
        .collect();
    children.sort_by(|a, b| (a.1.name.as_str(), a.1.index).cmp(&(b.1.name.as_str(), b.1.index)));

    for (id, item) in children {
        let last = item
            .last_transition
            .map(|transition| transition.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}{} #{} [{}] {} (last: {}, id: {})",
            "  ".repeat(depth),
            item.name,
            item.index,
            item.kind,
            item.state,
            last,
            id
        );
        if item.kind == PlanItemKind::Stage {
            print_plan_subtree(view, Some(id), depth + 1);
        }
    }
}
