use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use ownwrites_common::telemetry::{self, TelemetryConfig};
use ownwrites_editor_core::{
    Command, ContentSurface, EditorAction, EditorConfig, Editor, HeadingLevel, JsonFileStore, KeyValueStore,
    MemoryBackend, MemoryStore, ScriptedHost, Selection, TracingNotifier, autosave_key, execute_command,
    outline_to_html, parse_outline,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(version, about = "ownwrites - headless tools for the post editor", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Editor config file (.json or .toml)
    #[arg(long, global = true, env = "OWNWRITES_CONFIG")]
    config: Option<PathBuf>,

    /// Autosave store file
    #[arg(long, global = true, env = "OWNWRITES_STORE")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render an outline JSON file to the markup the editor would insert
    Outline {
        /// Outline JSON: an array of {type, text, children}
        file: PathBuf,
    },
    /// Apply a formatting command to an HTML fragment and print the result
    Format {
        /// HTML fragment file
        file: PathBuf,

        /// Selection start, in caret positions
        #[arg(long, default_value_t = 0)]
        start: usize,

        /// Selection end. Defaults to the end of the document
        #[arg(long)]
        end: Option<usize>,

        #[arg(long, value_enum)]
        action: FormatAction,

        /// Link target, for `--action link`
        #[arg(long)]
        url: Option<String>,
    },
    /// Inspect autosaved drafts
    Draft {
        #[command(subcommand)]
        command: DraftCommand,
    },
}

#[derive(Subcommand)]
enum DraftCommand {
    /// List autosave keys in the store
    List,
    /// Print a saved draft snapshot
    Show {
        /// Post id; omit for the new-post draft
        #[arg(long)]
        post: Option<String>,
    },
    /// Validate a saved draft and print the payload a submit would send
    Preview {
        #[arg(long)]
        post: Option<String>,

        #[arg(long, value_enum, default_value_t = Status::Draft)]
        status: Status,

        /// Publish time for scheduled posts (RFC 3339)
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Delete a saved draft
    Clear {
        #[arg(long)]
        post: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatAction {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Highlight,
    Clear,
    H1,
    H2,
    H3,
    H4,
    Quote,
    Code,
    Paragraph,
    Ol,
    Ul,
    Hr,
    Link,
}

impl FormatAction {
    fn editor_action(self) -> Option<EditorAction> {
        let action = match self {
            FormatAction::Bold => EditorAction::Bold,
            FormatAction::Italic => EditorAction::Italic,
            FormatAction::Underline => EditorAction::Underline,
            FormatAction::Strikethrough => EditorAction::Strikethrough,
            FormatAction::Highlight => EditorAction::Highlight,
            FormatAction::Clear => EditorAction::ClearFormatting,
            FormatAction::H1 => EditorAction::Heading(HeadingLevel::H1),
            FormatAction::H2 => EditorAction::Heading(HeadingLevel::H2),
            FormatAction::H3 => EditorAction::Heading(HeadingLevel::H3),
            FormatAction::H4 => EditorAction::Heading(HeadingLevel::H4),
            FormatAction::Quote => EditorAction::Blockquote,
            FormatAction::Code => EditorAction::CodeBlock,
            FormatAction::Paragraph => EditorAction::Paragraph,
            FormatAction::Ol => EditorAction::OrderedList,
            FormatAction::Ul => EditorAction::UnorderedList,
            FormatAction::Hr => EditorAction::HorizontalRule,
            FormatAction::Link => return None,
        };
        Some(action)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Status {
    Draft,
    Published,
    Scheduled,
}

impl From<Status> for ownwrites_editor_core::PostStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::Draft => Self::Draft,
            Status::Published => Self::Published,
            Status::Scheduled => Self::Scheduled,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_miette();
    telemetry::init(TelemetryConfig::from_env("ownwrites-cli"));

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };

    match cli.command {
        Commands::Outline { file } => render_outline(&file)?,
        Commands::Format {
            file,
            start,
            end,
            action,
            url,
        } => format_file(&file, &config, start, end, action, url)?,
        Commands::Draft { command } => {
            let store_path = match cli.store {
                Some(path) => path,
                None => default_store_path()?,
            };
            tracing::debug!(path = %store_path.display(), "using autosave store");
            let mut store = JsonFileStore::new(&store_path);
            match command {
                DraftCommand::List => {
                    for key in store.entries()?.keys() {
                        println!("{key}");
                    }
                }
                DraftCommand::Show { post } => {
                    let raw = load_snapshot(&store, post.as_deref())?;
                    let value: serde_json::Value = serde_json::from_str(&raw).into_diagnostic()?;
                    println!("{}", serde_json::to_string_pretty(&value).into_diagnostic()?);
                }
                DraftCommand::Preview { post, status, at } => {
                    let raw = load_snapshot(&store, post.as_deref())?;
                    preview_submit(config, &raw, status, at).await?;
                }
                DraftCommand::Clear { post } => {
                    let key = autosave_key(post.as_deref());
                    store.remove(&key)?;
                    println!("Cleared {key} from {}", store.path().display());
                }
            }
        }
    }

    Ok(())
}

fn render_outline(file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file).into_diagnostic()?;
    let json: serde_json::Value = serde_json::from_str(&text).into_diagnostic()?;
    let outline = parse_outline(&json)?;
    println!("{}", outline_to_html(&outline));
    Ok(())
}

fn format_file(
    file: &Path,
    config: &EditorConfig,
    start: usize,
    end: Option<usize>,
    action: FormatAction,
    url: Option<String>,
) -> Result<()> {
    let html = std::fs::read_to_string(file).into_diagnostic()?;
    let mut surface = ContentSurface::from_html(&html, config.undo_depth);
    let selection = Selection::new(start, end.unwrap_or_else(|| surface.len()));

    let command = match action.editor_action() {
        Some(action) => Command::from_action(action)
            .ok_or_else(|| miette::miette!("{action:?} needs input from an interactive host"))?,
        None => {
            let url = url.ok_or_else(|| miette::miette!("--url is required for --action link"))?;
            let url = ownwrites_editor_core::execute::normalize_link_url(&url)
                .ok_or_else(|| miette::miette!("--url must not be empty"))?;
            Command::Link { url }
        }
    };
    execute_command(&mut surface, selection, &command)?;
    println!("{}", surface.inner_html());
    Ok(())
}

fn load_snapshot(store: &JsonFileStore, post: Option<&str>) -> Result<String> {
    let key = autosave_key(post);
    store
        .get(&key)?
        .ok_or_else(|| miette::miette!("No draft saved under {key} in {}", store.path().display()))
}

/// Run the real submit path against an in-memory backend. The on-disk draft is left alone.
async fn preview_submit(
    config: EditorConfig,
    raw_snapshot: &str,
    status: Status,
    at: Option<DateTime<Utc>>,
) -> Result<()> {
    let mut scratch = MemoryStore::new();
    scratch.set(&autosave_key(None), raw_snapshot)?;

    let mut editor = Editor::new_post(config, scratch, TracingNotifier);
    let mut host = ScriptedHost::new().accepting_restore(true);
    if !editor.mount(&mut host) {
        return Err(miette::miette!("Saved draft is empty"));
    }
    if status == Status::Scheduled {
        editor.set_scheduled_publish_time(at);
    }

    let backend = MemoryBackend::new();
    editor.submit(status.into(), &backend).await?;
    let payload = backend
        .last_payload()
        .ok_or_else(|| miette::miette!("Nothing was submitted"))?;
    println!("{}", serde_json::to_string_pretty(&payload).into_diagnostic()?);
    Ok(())
}

fn default_store_path() -> Result<PathBuf> {
    let dir = dirs::data_dir().ok_or_else(|| miette::miette!("Could not determine data directory"))?;
    Ok(dir.join("ownwrites").join("autosave.json"))
}

fn init_miette() {
    // A hook is already set if we're embedded; keep theirs.
    let _ = miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }));
    miette::set_panic_hook();
}
