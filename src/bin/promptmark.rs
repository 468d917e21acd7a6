use async_trait::async_trait;
use clap::{command, Parser, Subcommand};
use promptmark::{
    config::{self, PromptConfig},
    create_input_iterator,
    input::{InputPrompter, PromptAnswer, PrompterError, ValidationError},
    parse_file, Error, InputRequirement, InputValues, MissingDefaultPolicy, Renderer, Value,
};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the inputs a prompt file needs, as JSON
    Inputs { file: PathBuf },
    /// Collect inputs and render a prompt file
    Render {
        file: PathBuf,

        #[arg(short, long)]
        provider: Option<String>,

        #[arg(short, long)]
        model: Option<String>,

        /// JSON object of input values
        #[arg(long)]
        values: Option<PathBuf>,

        /// error, skip or default
        #[arg(long)]
        on_missing_default: Option<MissingDefaultPolicy>,

        /// Ask for missing values on the terminal
        #[arg(short, long)]
        interactive: bool,

        /// Leave `{name}` markers for missing inputs
        #[arg(long)]
        partial: bool,

        /// Print the whole result as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Reads answers line by line; `<` goes back, an empty line accepts the suggestion.
struct TerminalPrompter {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl TerminalPrompter {
    fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }
}

#[async_trait]
impl InputPrompter for TerminalPrompter {
    async fn ask(
        &self,
        requirement: &InputRequirement,
        suggested: Option<Value>,
        errors: &[ValidationError],
    ) -> Result<PromptAnswer, PrompterError> {
        for error in errors {
            eprintln!("  {}", error);
        }
        let hint = suggested
            .as_ref()
            .map(|value| format!(" [{}]", value))
            .unwrap_or_default();
        eprint!("{}{}: ", requirement.label, hint);

        let mut lines = self.lines.lock().await;
        let line = lines
            .next_line()
            .await
            .map_err(|e| PrompterError::Io(e.to_string()))?;
        Ok(match line.as_deref().map(str::trim) {
            None => PromptAnswer::Cancel,
            Some("<") => PromptAnswer::Back,
            Some("") => PromptAnswer::Value(suggested.unwrap_or_else(|| Value::string(""))),
            Some(answer) => PromptAnswer::Value(Value::string(answer)),
        })
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, Error> {
    serde_json::to_string_pretty(value)
        .map_err(|e| Error::Internal(format!("Failed to serialize output: {}", e)))
}

async fn run(cli: Cli) -> Result<(), Error> {
    let mut config = match &cli.config {
        Some(path) => PromptConfig::from_file(path)?,
        None => PromptConfig::default(),
    };
    info!("config loaded.");
    debug!("config: {:?}", config);

    match cli.command {
        Command::Inputs { file } => {
            let root = parse_file(&file)?;
            let discovery = Renderer::default().discover(&root, None).await?;
            println!("{}", to_json(&discovery.requirements)?);
        }
        Command::Render {
            file,
            provider,
            model,
            values,
            on_missing_default,
            interactive,
            partial,
            json,
        } => {
            if provider.is_some() {
                config.env.llm.provider = provider;
            }
            if model.is_some() {
                config.env.llm.model = model;
            }
            if let Some(policy) = on_missing_default {
                config.inputs.on_missing_default = policy;
            }
            config.render.partial |= partial;

            let supplied: InputValues = match &values {
                Some(path) => config::from_file(path)?,
                None => InputValues::new(),
            };
            let root = parse_file(&file)?;
            debug!("Parsed {:?}", file);

            let mut options = config.iterator_options();
            options.values = supplied;
            let mut iterator = create_input_iterator(root.clone(), options);
            let inputs = if interactive {
                iterator.run_interactive(&TerminalPrompter::new()).await?
            } else {
                iterator
                    .run_non_interactive(config.inputs.on_missing_default)
                    .await?
            };

            let result = Renderer::default()
                .render(&root, &config.render_options().with_inputs(inputs))
                .await;
            if json {
                println!("{}", to_json(&result)?);
            } else {
                for diagnostic in &result.diagnostics {
                    eprintln!("{}: {}", diagnostic.severity, diagnostic.message);
                }
                println!("{}", result.text);
                if !result.post_execution.is_empty() {
                    eprintln!("post-execution: {}", to_json(&result.post_execution)?);
                }
            }
            if let Some(error) = result.error {
                return Err(error.into());
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
