mod config;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;

use stratus_core::differ::create_plan;
use stratus_core::effect::Effect;
use stratus_core::interpreter::{EffectOutcome, Interpreter};
use stratus_core::plan::Plan;
use stratus_core::provider::Provider;
use stratus_core::registry::ProviderRegistry;
use stratus_core::resource::{Attributes, Resource, ResourceId, State, Value};
use stratus_state::{BackendConfig, LocalBackend, StateBackend, StateFile, create_backend};

use crate::config::ConfigFile;

#[derive(Parser)]
#[command(name = "stratus")]
#[command(about = "Declarative reconciliation of cloud resources", long_about = None)]
struct Cli {
    /// Path to the state file
    #[arg(long, global = true, default_value = LocalBackend::DEFAULT_STATE_FILE)]
    state: PathBuf,

    /// AWS region, overriding the configuration file
    #[arg(long, global = true, env = "AWS_REGION")]
    region: Option<String>,

    /// Log debug output (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration file without contacting AWS APIs
    Validate {
        #[arg(default_value = "stratus.json")]
        file: PathBuf,
    },
    /// Show execution plan without applying changes
    Plan {
        #[arg(default_value = "stratus.json")]
        file: PathBuf,
    },
    /// Apply changes to reach the desired state
    Apply {
        #[arg(default_value = "stratus.json")]
        file: PathBuf,
    },
    /// Destroy every resource recorded in state
    Destroy {
        #[arg(default_value = "stratus.json")]
        file: PathBuf,

        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Adopt an existing remote object into state
    Import {
        file: PathBuf,
        /// Resource type (e.g., codestarnotifications.notification_rule)
        resource_type: String,
        /// Resource name in the configuration file
        name: String,
        /// Remote identifier (e.g., the rule ARN)
        identifier: String,
    },
    /// Re-read every resource in state and drop those deleted out of band
    Refresh {
        #[arg(default_value = "stratus.json")]
        file: PathBuf,
    },
    /// Remove a stale state lock
    ForceUnlock { lock_id: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let ctx = Context {
        state_path: cli.state,
        region: cli.region,
    };

    let result = match cli.command {
        Commands::Validate { file } => run_validate(&ctx, &file).await,
        Commands::Plan { file } => run_plan(&ctx, &file).await,
        Commands::Apply { file } => run_apply(&ctx, &file).await,
        Commands::Destroy { file, auto_approve } => run_destroy(&ctx, &file, auto_approve).await,
        Commands::Import {
            file,
            resource_type,
            name,
            identifier,
        } => run_import(&ctx, &file, ResourceId::new(resource_type, name), &identifier).await,
        Commands::Refresh { file } => run_refresh(&ctx, &file).await,
        Commands::ForceUnlock { lock_id } => run_force_unlock(&ctx, &lock_id).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Settings shared by every command
struct Context {
    state_path: PathBuf,
    region: Option<String>,
}

impl Context {
    async fn backend(&self) -> Result<Box<dyn StateBackend>, String> {
        create_backend(&BackendConfig::local(self.state_path.to_string_lossy()))
            .await
            .map_err(|e| e.to_string())
    }

    async fn provider(&self, config: &ConfigFile) -> ProviderRegistry {
        let mut provider_config = config.provider.clone();
        if let Some(region) = &self.region {
            provider_config = provider_config.with_region(region);
        }
        stratus_provider_aws::load(&provider_config).await
    }
}

fn validate_resources(provider: &dyn Provider, resources: &[Resource]) -> Result<(), String> {
    let errors: Vec<String> = resources
        .iter()
        .filter_map(|r| provider.validate(r).err())
        .map(|e| format!("  {}", e))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(format!("Validation failed:\n{}", errors.join("\n")))
    }
}

/// Load and validate the configuration, returning the provider and desired resources
async fn load(ctx: &Context, file: &Path) -> Result<(ProviderRegistry, Vec<Resource>), String> {
    let config = ConfigFile::load(file)?;
    let desired = config.desired()?;
    let provider = ctx.provider(&config).await;
    validate_resources(&provider, &desired)?;
    Ok((provider, desired))
}

async fn read_state(backend: &dyn StateBackend) -> Result<StateFile, String> {
    Ok(backend
        .read_state()
        .await
        .map_err(|e| e.to_string())?
        .unwrap_or_default())
}

async fn save_state(backend: &dyn StateBackend, state: &mut StateFile) -> Result<(), String> {
    state.increment_serial();
    backend
        .write_state(state)
        .await
        .map_err(|e| format!("Failed to write state: {}", e))
}

/// Replace the stored resources with a refreshed set, returning the ids dropped
fn sync_refreshed(
    file: &mut StateFile,
    refreshed: &HashMap<ResourceId, State>,
    provider: &str,
) -> Vec<ResourceId> {
    let dropped: Vec<ResourceId> = file
        .resources
        .iter()
        .map(|r| r.id())
        .filter(|id| !refreshed.contains_key(id))
        .collect();
    for id in &dropped {
        file.remove_resource(id);
    }
    for state in refreshed.values() {
        file.record(state, provider);
    }
    dropped
}

/// Record a successful effect in the state file
fn record_outcome(file: &mut StateFile, outcome: &EffectOutcome, provider: &str) {
    match outcome {
        EffectOutcome::Read { .. } | EffectOutcome::Skipped { .. } => {}
        EffectOutcome::Deleted { id } => {
            file.remove_resource(id);
        }
        EffectOutcome::Created { .. }
        | EffectOutcome::Updated { .. }
        | EffectOutcome::Replaced { .. } => {
            if let Some(state) = outcome.state() {
                file.record(state, provider);
            }
        }
    }
}

/// Run `body` while holding the state lock for `operation`
macro_rules! locked {
    ($backend:expr, $operation:expr, $body:expr) => {{
        let lock = $backend
            .acquire_lock($operation)
            .await
            .map_err(|e| e.to_string())?;
        let result = $body.await;
        if let Err(e) = $backend.release_lock(&lock).await {
            log::error!("Failed to release state lock {}: {}", lock.id, e);
        }
        result
    }};
}

async fn run_validate(ctx: &Context, file: &Path) -> Result<(), String> {
    println!("{}", "Validating...".cyan());

    let (_, desired) = load(ctx, file).await?;

    println!(
        "{}",
        format!("✓ {} resources validated successfully.", desired.len())
            .green()
            .bold()
    );
    for resource in &desired {
        println!("  • {}", resource.id);
    }
    Ok(())
}

async fn run_plan(ctx: &Context, file: &Path) -> Result<(), String> {
    let (provider, desired) = load(ctx, file).await?;
    let backend = ctx.backend().await?;
    let state = read_state(&*backend).await?;

    let interpreter = Interpreter::new(provider);
    let current = interpreter
        .refresh(&state.states())
        .await
        .map_err(|e| e.to_string())?;
    let plan = create_plan(interpreter.provider(), &desired, &current).map_err(|e| e.to_string())?;

    print_plan(&plan);
    Ok(())
}

async fn run_apply(ctx: &Context, file: &Path) -> Result<(), String> {
    let (provider, desired) = load(ctx, file).await?;
    let backend = ctx.backend().await?;
    let interpreter = Interpreter::new(provider);

    locked!(backend, "apply", apply_locked(&interpreter, &*backend, &desired))
}

async fn apply_locked(
    interpreter: &Interpreter<ProviderRegistry>,
    backend: &dyn StateBackend,
    desired: &[Resource],
) -> Result<(), String> {
    let provider_name = interpreter.provider().name();
    let mut state = read_state(backend).await?;

    let refreshed = interpreter
        .refresh(&state.states())
        .await
        .map_err(|e| e.to_string())?;
    let dropped = sync_refreshed(&mut state, &refreshed, provider_name);
    if !dropped.is_empty() {
        for id in &dropped {
            println!("{} {} no longer exists, removed from state", "!".yellow(), id);
        }
        save_state(backend, &mut state).await?;
    }

    let plan = create_plan(interpreter.provider(), desired, &refreshed).map_err(|e| e.to_string())?;
    print_plan(&plan);
    if plan.is_empty() {
        return Ok(());
    }

    println!();
    println!("{}", "Applying changes...".cyan().bold());
    println!();

    execute_plan(interpreter, backend, &mut state, &plan).await
}

/// Execute every effect, writing state after each one that succeeds
async fn execute_plan(
    interpreter: &Interpreter<ProviderRegistry>,
    backend: &dyn StateBackend,
    state: &mut StateFile,
    plan: &Plan,
) -> Result<(), String> {
    let provider_name = interpreter.provider().name();
    let mut success_count = 0;

    for effect in plan.effects() {
        match interpreter.execute(effect).await {
            Ok(outcome) => {
                if effect.is_mutating() {
                    println!("  {} {}", "✓".green(), format_effect(effect));
                    success_count += 1;
                }
                record_outcome(state, &outcome, provider_name);
                if effect.is_mutating() {
                    save_state(backend, state).await?;
                }
            }
            Err(e) => {
                println!("  {} {} - {}", "✗".red(), format_effect(effect), e);
                println!();
                return Err(format!(
                    "Apply stopped after {} of {} changes",
                    success_count,
                    plan.mutation_count()
                ));
            }
        }
    }

    println!();
    println!(
        "{}",
        format!("Apply complete! {} changes applied.", success_count)
            .green()
            .bold()
    );
    Ok(())
}

async fn run_destroy(ctx: &Context, file: &Path, auto_approve: bool) -> Result<(), String> {
    let config = ConfigFile::load(file)?;
    let provider = ctx.provider(&config).await;
    let backend = ctx.backend().await?;
    let interpreter = Interpreter::new(provider);

    locked!(
        backend,
        "destroy",
        destroy_locked(&interpreter, &*backend, auto_approve)
    )
}

async fn destroy_locked(
    interpreter: &Interpreter<ProviderRegistry>,
    backend: &dyn StateBackend,
    auto_approve: bool,
) -> Result<(), String> {
    let mut state = read_state(backend).await?;
    let plan = create_plan(interpreter.provider(), &[], &state.states()).map_err(|e| e.to_string())?;

    if plan.is_empty() {
        println!("{}", "No resources to destroy.".green());
        return Ok(());
    }

    println!("{}", "Destroy Plan:".red().bold());
    println!();
    for effect in plan.effects() {
        println!("  {} {}", "-".red().bold(), effect.resource_id());
    }
    println!();
    println!("Plan: {} to destroy.", plan.mutation_count().to_string().red());
    println!();

    if !auto_approve && !confirm("Do you really want to destroy all resources?")? {
        println!();
        println!("{}", "Destroy cancelled.".yellow());
        return Ok(());
    }

    println!("{}", "Destroying resources...".red().bold());
    println!();
    execute_plan(interpreter, backend, &mut state, &plan).await
}

fn confirm(question: &str) -> Result<bool, String> {
    println!("{}", question.yellow().bold());
    println!(
        "  {}",
        "This action cannot be undone. Type 'yes' to confirm.".yellow()
    );
    print!("\n  Enter a value: ");
    std::io::Write::flush(&mut std::io::stdout()).map_err(|e| e.to_string())?;

    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .map_err(|e| e.to_string())?;
    Ok(input.trim() == "yes")
}

async fn run_import(
    ctx: &Context,
    file: &Path,
    id: ResourceId,
    identifier: &str,
) -> Result<(), String> {
    let config = ConfigFile::load(file)?;
    let declared = config.desired()?.iter().any(|r| r.id == id && !r.is_data_source());
    if !declared {
        log::warn!(
            "{} is not declared in {}; the next apply will delete it",
            id,
            file.display()
        );
    }

    let provider = ctx.provider(&config).await;
    let backend = ctx.backend().await?;

    locked!(
        backend,
        "import",
        import_locked(&provider, &*backend, &id, identifier)
    )
}

async fn import_locked(
    provider: &ProviderRegistry,
    backend: &dyn StateBackend,
    id: &ResourceId,
    identifier: &str,
) -> Result<(), String> {
    let mut state = read_state(backend).await?;
    if let Some(existing) = state.find_resource(id) {
        return Err(format!(
            "{} is already managed (identifier: {})",
            id, existing.identifier
        ));
    }

    let imported = provider
        .import(id, identifier)
        .await
        .map_err(|e| e.to_string())?;
    state.record(&imported, provider.name());
    save_state(backend, &mut state).await?;

    println!("{} Imported {} ({})", "✓".green(), id, identifier);
    Ok(())
}

async fn run_refresh(ctx: &Context, file: &Path) -> Result<(), String> {
    let config = ConfigFile::load(file)?;
    let provider = ctx.provider(&config).await;
    let backend = ctx.backend().await?;
    let interpreter = Interpreter::new(provider);

    locked!(backend, "refresh", refresh_locked(&interpreter, &*backend))
}

async fn refresh_locked(
    interpreter: &Interpreter<ProviderRegistry>,
    backend: &dyn StateBackend,
) -> Result<(), String> {
    let mut state = read_state(backend).await?;
    let refreshed = interpreter
        .refresh(&state.states())
        .await
        .map_err(|e| e.to_string())?;
    let dropped = sync_refreshed(&mut state, &refreshed, interpreter.provider().name());
    save_state(backend, &mut state).await?;

    for id in &dropped {
        println!("  {} {} (deleted outside of stratus)", "-".red().bold(), id);
    }
    println!(
        "{}",
        format!(
            "Refreshed {} resources, {} removed from state.",
            refreshed.len(),
            dropped.len()
        )
        .green()
    );
    Ok(())
}

async fn run_force_unlock(ctx: &Context, lock_id: &str) -> Result<(), String> {
    let backend = ctx.backend().await?;
    backend
        .force_unlock(lock_id)
        .await
        .map_err(|e| e.to_string())?;
    println!("{}", format!("Lock {} released.", lock_id).green());
    Ok(())
}

fn print_plan(plan: &Plan) {
    if plan.is_empty() {
        println!("{}", "No changes. Infrastructure is up-to-date.".green());
        return;
    }

    println!("{}", "Execution Plan:".cyan().bold());
    println!();

    for effect in plan.effects() {
        match effect {
            Effect::Read(r) => {
                println!("  {} {} {}", "<=".cyan().bold(), r.id, "(read)".dimmed());
            }
            Effect::Create(r) => {
                println!("  {} {}", "+".green().bold(), r.id.to_string().cyan().bold());
                for (key, value) in sorted(&r.attributes) {
                    println!("      {}: {}", key.bold(), format_value(value).green());
                }
            }
            Effect::Update {
                from,
                to,
                changed_attributes,
            } => {
                println!("  {} {}", "~".yellow().bold(), to.id.to_string().cyan().bold());
                print_changes(&from.attributes, &to.attributes, changed_attributes, None);
            }
            Effect::Replace {
                from,
                to,
                replace_attributes,
            } => {
                println!(
                    "  {} {} {}",
                    "-/+".magenta().bold(),
                    to.id.to_string().cyan().bold(),
                    "(must be replaced)".magenta()
                );
                print_changes(
                    &from.attributes,
                    &to.attributes,
                    replace_attributes,
                    Some("forces replacement"),
                );
            }
            Effect::Delete(state) => {
                println!("  {} {}", "-".red().bold(), state.id.to_string().cyan().bold());
                if let Some(identifier) = &state.identifier {
                    println!("      {}: {}", "identifier".bold(), identifier.red());
                }
            }
        }
    }

    let summary = plan.summary();
    println!();
    println!(
        "Plan: {} to create, {} to update, {} to replace, {} to delete.",
        summary.create.to_string().green(),
        summary.update.to_string().yellow(),
        summary.replace.to_string().magenta(),
        summary.delete.to_string().red()
    );
}

fn print_changes(old: &Attributes, new: &Attributes, keys: &[String], note: Option<&str>) {
    for key in keys {
        let old_str = old.get(key).map(format_value).unwrap_or_else(|| "(none)".to_string());
        let new_str = new.get(key).map(format_value).unwrap_or_else(|| "(none)".to_string());
        match note {
            Some(note) => println!(
                "      {}: {} → {} {}",
                key.bold(),
                old_str.red(),
                new_str.green(),
                format!("# {}", note).dimmed()
            ),
            None => println!("      {}: {} → {}", key.bold(), old_str.red(), new_str.green()),
        }
    }
}

fn sorted(attributes: &Attributes) -> BTreeMap<&String, &Value> {
    attributes.iter().collect()
}

fn format_effect(effect: &Effect) -> String {
    match effect {
        Effect::Read(r) => format!("Read {}", r.id),
        Effect::Create(r) => format!("Create {}", r.id),
        Effect::Update { to, .. } => format!("Update {}", to.id),
        Effect::Replace { to, .. } => format!("Replace {}", to.id),
        Effect::Delete(state) => format!("Delete {}", state.id),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Int(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::List(items) => {
            let strs: Vec<_> = items.iter().map(format_value).collect();
            format!("[{}]", strs.join(", "))
        }
        Value::Map(map) => {
            let strs: Vec<_> = sorted(map)
                .into_iter()
                .map(|(k, v)| format!("{}: {}", k, format_value(v)))
                .collect();
            format!("{{{}}}", strs.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_state(name: &str) -> State {
        State::existing(
            ResourceId::new("codestarnotifications.notification_rule", name),
            format!("arn:aws:codestar-notifications:us-east-1:123456789012:notificationrule/{}", name),
            HashMap::new(),
        )
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&Value::String("BASIC".to_string())), "\"BASIC\"");
        assert_eq!(
            format_value(&Value::List(vec![Value::Int(1), Value::Bool(true)])),
            "[1, true]"
        );
        let map: Attributes = [
            ("type".to_string(), Value::String("SNS".to_string())),
            ("address".to_string(), Value::String("arn".to_string())),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            format_value(&Value::Map(map)),
            "{address: \"arn\", type: \"SNS\"}"
        );
    }

    #[test]
    fn test_format_effect() {
        let effect = Effect::Delete(rule_state("builds"));
        assert_eq!(
            format_effect(&effect),
            "Delete codestarnotifications.notification_rule.builds"
        );
    }

    #[test]
    fn refresh_drops_missing_entries() {
        let mut file = StateFile::new();
        file.record(&rule_state("a"), "aws");
        file.record(&rule_state("b"), "aws");

        let refreshed: HashMap<ResourceId, State> = [rule_state("b")]
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();
        let dropped = sync_refreshed(&mut file, &refreshed, "aws");

        assert_eq!(dropped, vec![rule_state("a").id]);
        assert_eq!(file.resources.len(), 1);
        assert_eq!(file.resources[0].name, "b");
    }

    #[test]
    fn outcomes_update_state_file() {
        let mut file = StateFile::new();
        let state = rule_state("a");

        record_outcome(&mut file, &EffectOutcome::Created { state: state.clone() }, "aws");
        assert!(file.find_resource(&state.id).is_some());

        record_outcome(&mut file, &EffectOutcome::Read { state: rule_state("data") }, "aws");
        assert_eq!(file.resources.len(), 1);

        record_outcome(&mut file, &EffectOutcome::Deleted { id: state.id.clone() }, "aws");
        assert!(file.resources.is_empty());
    }
}
