use actcore::{
    ActivityDefinition, Variables, WorkflowDefinitionBuilder, WorkflowDefinitionVersion,
    WorkflowExpression, WorkflowInstance,
};
use actruntime::{ActivityRuntime, RuntimeConfig};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "actflow")]
#[command(about = "Activity workflow CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and run a workflow definition
    Run {
        /// Path to workflow definition JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Workflow input scope as a JSON object
        #[arg(short, long)]
        input: Option<String>,

        /// Launch-time variables as a JSON object
        #[arg(short, long)]
        launch: Option<String>,

        /// Resume from a saved instance instead of starting fresh
        #[arg(long)]
        resume: Option<PathBuf>,

        /// Write the instance snapshot here after the run
        #[arg(long)]
        save: Option<PathBuf>,

        /// Correlation id attached to the run
        #[arg(long)]
        correlation_id: Option<String>,

        /// Maximum activities executed in one run
        #[arg(long)]
        max_steps: Option<usize>,

        /// Per-activity timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Build a workflow definition without running it
    Validate {
        /// Path to workflow definition JSON file
        file: PathBuf,
    },

    /// List available activity types
    Activities,

    /// Create a new example workflow definition
    Init {
        /// Output file path
        #[arg(short, long, default_value = "workflow.json")]
        output: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            input,
            launch,
            resume,
            save,
            correlation_id,
            max_steps,
            timeout_ms,
            verbose,
        } => {
            init_tracing(verbose);

            let defaults = RuntimeConfig::default();
            let config = RuntimeConfig {
                max_steps: max_steps.unwrap_or(defaults.max_steps),
                activity_timeout_ms: timeout_ms.or(defaults.activity_timeout_ms),
            };
            let options = RunOptions {
                input,
                launch,
                resume,
                save,
                correlation_id,
            };
            run_workflow(&file, options, config).await?;
        }

        Commands::Validate { file } => {
            init_tracing(false);
            validate_workflow(&file)?;
        }

        Commands::Activities => {
            list_activities();
        }

        Commands::Init { output } => {
            create_example_workflow(&output)?;
        }
    }

    Ok(())
}

struct RunOptions {
    input: Option<String>,
    launch: Option<String>,
    resume: Option<PathBuf>,
    save: Option<PathBuf>,
    correlation_id: Option<String>,
}

fn load_definition(file: &Path) -> Result<WorkflowDefinitionVersion> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("reading workflow definition {}", file.display()))?;
    let definition = serde_json::from_str(&json)
        .with_context(|| format!("parsing workflow definition {}", file.display()))?;
    Ok(definition)
}

fn parse_variables(flag: &str, raw: Option<&str>) -> Result<Variables> {
    let Some(raw) = raw else {
        return Ok(Variables::new());
    };
    let json: serde_json::Value =
        serde_json::from_str(raw).with_context(|| format!("--{} is not valid JSON", flag))?;
    if !json.is_object() {
        anyhow::bail!("--{} must be a JSON object", flag);
    }
    Ok(Variables::from_json(json))
}

async fn run_workflow(file: &Path, options: RunOptions, config: RuntimeConfig) -> Result<()> {
    let definition = load_definition(file)?;
    let input = parse_variables("input", options.input.as_deref())?;
    let launch = parse_variables("launch", options.launch.as_deref())?;

    let saved: Option<WorkflowInstance> = match &options.resume {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading saved instance {}", path.display()))?;
            Some(serde_json::from_str(&json)?)
        }
        None => None,
    };

    println!("Workflow: {}", definition.name.as_deref().unwrap_or(&definition.id));
    println!("   Activities: {}", definition.activities.len());
    println!("   Connections: {}", definition.connections.len());
    println!();

    let runtime = ActivityRuntime::with_config(activities::standard_registry(), config);
    let input = if saved.is_some() && input.is_empty() {
        None
    } else {
        Some(input)
    };
    let mut workflow =
        runtime.create_workflow(definition, input, saved.as_ref(), options.correlation_id)?;

    let cancellation = CancellationToken::new();
    let on_interrupt = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling run");
            on_interrupt.cancel();
        }
    });

    let outcome = runtime.run(&mut workflow, &launch, &cancellation).await?;

    println!();
    println!("Run summary:");
    println!("   Workflow ID: {}", workflow.id());
    println!("   Status: {:?}", outcome.status);
    println!("   Executed: {}", outcome.executed.join(" -> "));
    println!("   Duration: {}ms", outcome.duration_ms);
    if let Some(fault) = workflow.fault() {
        println!("   Fault: {}", fault);
    }
    if !outcome.blocking.is_empty() {
        println!("   Blocking: {}", outcome.blocking.join(", "));
    }

    println!();
    println!("Workflow input:");
    println!("{}", serde_json::to_string_pretty(&workflow.input().to_json())?);

    let with_output: Vec<_> = workflow
        .activities()
        .filter(|a| !a.output().is_empty())
        .collect();
    if !with_output.is_empty() {
        println!();
        println!("Outputs:");
        for activity in with_output {
            println!("   {}:", activity.id());
            for (key, value) in activity.output().iter() {
                println!("     {}: {}", key, value.to_json());
            }
        }
    }

    if let Some(path) = options.save {
        let json = serde_json::to_string_pretty(&workflow.snapshot())?;
        std::fs::write(&path, json)
            .with_context(|| format!("writing instance snapshot {}", path.display()))?;
        println!();
        println!("Saved instance to {}", path.display());
    }

    Ok(())
}

fn validate_workflow(file: &Path) -> Result<()> {
    println!("Validating workflow: {}", file.display());

    let definition = load_definition(file)?;
    let runtime = ActivityRuntime::new(activities::standard_registry());

    match runtime.create_workflow(definition, None, None, None) {
        Ok(workflow) => {
            println!("Workflow is valid:");
            println!("   Definition: {} v{}", workflow.definition().id, workflow.definition().version);
            println!("   Activities: {}", workflow.activity_count());
            println!("   Connections: {}", workflow.connection_count());
            let starts: Vec<&str> = workflow.start_activities().iter().map(|a| a.id()).collect();
            println!("   Starts at: {}", starts.join(", "));
            Ok(())
        }
        Err(e) => Err(anyhow::Error::new(e).context("workflow definition is invalid")),
    }
}

fn list_activities() {
    println!("Available activity types:");
    println!();

    let registry = activities::standard_registry();
    for type_name in registry.registered_types() {
        if let Some(metadata) = registry.get_metadata(&type_name) {
            println!("  * {} ({})", type_name, metadata.category);
            println!("    {}", metadata.description);
        } else {
            println!("  * {}", type_name);
        }
    }
    println!();
    println!(
        "Types also resolve by qualified name, e.g. {}::Absolute",
        activities::QUALIFIED_PREFIX
    );
}

fn create_example_workflow(output: &Path) -> Result<()> {
    let definition = WorkflowDefinitionBuilder::new()
        .with_name("Absolute value example")
        .activity(
            ActivityDefinition::new("assign", "SetVariable")
                .with_state("variableName", serde_json::json!("magnitude"))
                .with_expression("valueExpression", WorkflowExpression::variable("amount")),
        )
        .activity(
            ActivityDefinition::new("check", "IfElse").with_expression(
                "conditionExpression",
                WorkflowExpression::variable("report"),
            ),
        )
        .activity(
            ActivityDefinition::new("abs", "Absolute")
                .with_expression("valueExpression", WorkflowExpression::variable("magnitude")),
        )
        .activity(
            ActivityDefinition::new("log", "WriteLine")
                .with_expression("textExpression", WorkflowExpression::literal("skipped")),
        )
        .connect("assign", "check", "Done")
        .connect("check", "abs", "True")
        .connect("check", "log", "False")
        .build();

    let json = serde_json::to_string_pretty(&definition)?;
    std::fs::write(output, json)?;

    println!("Created example workflow: {}", output.display());
    println!();
    println!("Run it with:");
    println!(
        "  actflow run --file {} --input '{{\"amount\": -42, \"report\": true}}'",
        output.display()
    );

    Ok(())
}
