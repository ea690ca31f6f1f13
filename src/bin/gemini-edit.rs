//! CLI for gemini-edit - image editing with natural-language prompts.

use clap::{Args, Parser, Subcommand, ValueEnum};
use gemini_edit::{
    EditError, EditorController, EditorView, GeminiEditor, GeminiModel, ImageEditor, ImageFormat,
    UiState,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SESSION_HELP: &str = "\
Commands:
  open <path|data-url>   select the image to edit
  prompt <text>          set the edit instruction
  generate               send the image and prompt to Gemini
  save <path>            write the edited image to a file
  show                   print the current state
  clear                  start over
  help                   show this help
  quit                   leave the session";

#[derive(Parser)]
#[command(name = "gemini-edit")]
#[command(about = "Edit images with natural-language prompts via Google Gemini")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Gemini API key (falls back to GOOGLE_API_KEY)
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model to use
    #[arg(short, long, global = true, value_enum, default_value = "flash")]
    model: ModelArg,

    /// Override the API endpoint
    #[arg(long, global = true, hide = true)]
    base_url: Option<String>,

    /// Log level, used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Edit an image once and save the result
    Edit(EditArgs),

    /// Interactive editing session on stdin
    Session,

    /// Verify the API key against the selected model
    Check,
}

#[derive(Args)]
struct EditArgs {
    /// Input image: a file path or a data URL
    input: String,

    /// The edit instruction
    #[arg(short, long)]
    prompt: String,

    /// Output file path (default: <input>-edited.<ext>)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelArg {
    /// gemini-2.5-flash-image
    Flash,
    /// gemini-3-pro-image-preview
    Pro,
}

impl From<ModelArg> for GeminiModel {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Flash => GeminiModel::NanoBanana,
            ModelArg::Pro => GeminiModel::NanoBananaPro,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionCommand {
    Open(String),
    Prompt(String),
    Generate,
    Save(PathBuf),
    Show,
    Clear,
    Help,
    Quit,
}

impl SessionCommand {
    /// Parses one input line; blank lines yield `None`.
    fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match (word.to_lowercase().as_str(), rest) {
            ("open", "") => return Err("usage: open <path|data-url>".into()),
            ("open", target) => Self::Open(target.to_string()),
            ("prompt", text) => Self::Prompt(text.to_string()),
            ("generate" | "go", _) => Self::Generate,
            ("save", "") => return Err("usage: save <path>".into()),
            ("save", path) => Self::Save(PathBuf::from(path)),
            ("show", _) => Self::Show,
            ("clear", _) => Self::Clear,
            ("help" | "?", _) => Self::Help,
            ("quit" | "exit", _) => Self::Quit,
            (other, _) => return Err(format!("unknown command '{other}', try 'help'")),
        };
        Ok(Some(command))
    }
}

fn setup_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli.log_level, cli.json_logs);

    let editor = build_editor(&cli)?;

    match cli.command {
        Commands::Edit(args) => edit_once(editor, args, cli.json).await?,
        Commands::Session => run_session(editor, cli.json).await?,
        Commands::Check => check(editor, cli.json).await?,
    }

    Ok(())
}

fn build_editor(cli: &Cli) -> anyhow::Result<GeminiEditor> {
    let mut builder = GeminiEditor::builder().model(cli.model.into());
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url);
    }
    Ok(builder.build()?)
}

/// Reports the loading state on stderr as the session changes.
fn spawn_progress_watcher(mut rx: watch::Receiver<UiState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut was_loading = false;
        while rx.changed().await.is_ok() {
            let loading = rx.borrow_and_update().is_loading;
            if loading && !was_loading {
                eprintln!("Generating...");
            }
            was_loading = loading;
        }
    })
}

async fn select_input<E: ImageEditor>(
    controller: &EditorController<E>,
    input: &str,
) -> Result<(), EditError> {
    if input.starts_with("data:") {
        controller.select_data_url("pasted image", input)
    } else {
        controller.select_image(input).await
    }
}

fn default_output_path(input: &str, format: ImageFormat) -> PathBuf {
    if input.starts_with("data:") {
        return PathBuf::from(format!("edited.{}", format.extension()));
    }
    let path = Path::new(input);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    path.with_file_name(format!("{stem}-edited.{}", format.extension()))
}

fn print_view(view: &EditorView, json_output: bool) -> anyhow::Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(view)?);
    } else {
        println!("{view}");
    }
    Ok(())
}

async fn edit_once(editor: GeminiEditor, args: EditArgs, json_output: bool) -> anyhow::Result<()> {
    let controller = EditorController::new(editor);
    let watcher = spawn_progress_watcher(controller.subscribe());

    let outcome = match select_input(&controller, &args.input).await {
        Ok(()) => {
            controller.set_prompt(&args.prompt);
            controller.generate().await
        }
        Err(e) => Err(e),
    };
    watcher.abort();

    let view = EditorView::render(&controller.state());
    let image = match outcome {
        Ok(image) => image,
        Err(e) => {
            print_view(&view, json_output)?;
            anyhow::bail!(e.user_message());
        }
    };

    let output = args
        .output
        .unwrap_or_else(|| default_output_path(&args.input, image.format()));
    image.save(&output)?;

    if json_output {
        let result = serde_json::json!({
            "type": "image",
            "success": true,
            "output": output.display().to_string(),
            "size_bytes": image.size(),
            "mime_type": image.mime_type,
            "model": image.metadata.model,
            "duration_ms": image.metadata.duration_ms,
            "view": view,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{view}\n");
        println!(
            "Edited image: {} ({} bytes) via {}",
            output.display(),
            image.size(),
            controller.editor().name()
        );
        if let Some(duration) = image.metadata.duration_ms {
            println!("Duration: {}ms", duration);
        }
    }

    Ok(())
}

async fn run_session(editor: GeminiEditor, json_output: bool) -> anyhow::Result<()> {
    let controller = EditorController::new(editor);
    let watcher = spawn_progress_watcher(controller.subscribe());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if !controller.editor().has_api_key() {
        eprintln!("warning: no API key configured, generate will fail until one is set");
    }
    println!("{SESSION_HELP}\n");

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match SessionCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(msg) => {
                eprintln!("{msg}");
                continue;
            }
        };

        match command {
            SessionCommand::Open(target) => {
                if let Err(e) = select_input(&controller, &target).await {
                    tracing::debug!("open failed: {e}");
                }
            }
            SessionCommand::Prompt(text) => controller.set_prompt(text),
            SessionCommand::Generate => {
                if let Err(e) = controller.generate().await {
                    tracing::debug!("generate failed: {e}");
                }
            }
            SessionCommand::Save(path) => {
                match controller.state().result_image {
                    Some(image) => match image.save(&path) {
                        Ok(()) => println!("Saved {}", path.display()),
                        Err(e) => eprintln!("{}", e.user_message()),
                    },
                    None => println!("Nothing to save yet."),
                }
                continue;
            }
            SessionCommand::Show => {}
            SessionCommand::Clear => {
                if let Err(e) = controller.clear() {
                    eprintln!("{}", e.user_message());
                }
            }
            SessionCommand::Help => {
                println!("{SESSION_HELP}");
                continue;
            }
            SessionCommand::Quit => break,
        }

        print_view(&EditorView::render(&controller.state()), json_output)?;
    }

    watcher.abort();
    Ok(())
}

async fn check(editor: GeminiEditor, json_output: bool) -> anyhow::Result<()> {
    let model = editor.model();
    let result = editor.health_check().await;

    if json_output {
        let report = serde_json::json!({
            "provider": editor.name(),
            "model": model.as_str(),
            "ok": result.is_ok(),
            "error": result.as_ref().err().map(|e| e.user_message()),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    match result {
        Ok(()) => {
            if !json_output {
                println!("{} is reachable with model {}", editor.name(), model);
            }
            Ok(())
        }
        Err(e) => anyhow::bail!(e.user_message()),
    }
}
