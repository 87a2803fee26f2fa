//! CLI argument definitions.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use crate::device::Model;
use crate::icon::Rgba;

/// deckhand - drive Elgato Stream Deck devices with persisted pages and
/// profiles.
#[derive(Parser, Debug)]
#[command(name = "deckhand", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (text for humans, json for scripts)
    #[arg(
        long,
        short = 'f',
        default_value = "text",
        global = true,
        env = "DECKHAND_FORMAT"
    )]
    pub format: OutputFormat,

    /// Shorthand for --format=json
    #[arg(long, global = true)]
    pub json: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Target device by serial number
    #[arg(long, short = 's', global = true, env = "DECKHAND_SERIAL")]
    pub serial: Option<String>,

    /// Config file (default: <config dir>/deckhand/config.toml)
    #[arg(long, short = 'c', global = true, env = "DECKHAND_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with optional color
    #[default]
    Text,
    /// Pretty printed JSON
    Json,
    /// Compact JSON (single line)
    JsonCompact,
}

impl Cli {
    /// Returns true if output should be JSON.
    pub const fn use_json(&self) -> bool {
        self.json || matches!(self.format, OutputFormat::Json | OutputFormat::JsonCompact)
    }

    /// Returns true if output should be compact JSON.
    pub const fn use_compact_json(&self) -> bool {
        matches!(self.format, OutputFormat::JsonCompact)
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List attached decks without opening them
    List,

    /// Show device information for one deck
    Info(InfoArgs),

    /// List or edit the profiles of one deck
    Profiles(ProfilesArgs),

    /// Drive every deck until interrupted
    Run(RunArgs),

    /// Render an icon for a model's key geometry into a file
    Render(RenderArgs),

    /// Show version and build information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Where decks come from.
#[derive(Parser, Debug, Clone, Copy, Default)]
pub struct DeckSource {
    /// Use N virtual decks instead of hardware
    #[arg(long, value_name = "N")]
    pub fake: Option<usize>,
}

#[derive(Parser, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub source: DeckSource,
}

#[derive(Parser, Debug)]
pub struct ProfilesArgs {
    #[command(flatten)]
    pub source: DeckSource,

    /// Add a profile with this name
    #[arg(long, value_name = "NAME")]
    pub add: Option<String>,

    /// Make this profile active
    #[arg(long, value_name = "ID")]
    pub activate: Option<String>,

    /// Rename a profile
    #[arg(long, num_args = 2, value_names = ["ID", "NAME"])]
    pub rename: Option<Vec<String>>,

    /// Remove a profile
    #[arg(long, value_name = "ID")]
    pub remove: Option<String>,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: DeckSource,

    /// Stop after this many seconds (default: run until Ctrl-C)
    #[arg(long, short = 't', value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Model whose key geometry and image format to use
    #[arg(long, short = 'm', default_value = "mk2", value_parser = parse_model)]
    pub model: Model,

    /// Named icon, looked up as <NAME>.png in the icon directories
    #[arg(long)]
    pub icon_name: Option<String>,

    /// Picture file
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Caption
    #[arg(long, short = 't')]
    pub text: Option<String>,

    /// Background color (rgb(r,g,b), rgba(r,g,b,a) or #rrggbb)
    #[arg(long, short = 'b', value_parser = parse_color)]
    pub background: Option<Rgba>,

    /// Extra icon directory (repeatable)
    #[arg(long, value_name = "DIR")]
    pub icon_dir: Vec<PathBuf>,

    /// Output file for the encoded image
    #[arg(long, short = 'o')]
    pub output: PathBuf,
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

/// Parse a model by its short name, e.g. `mk2` or `xl-v2`.
pub fn parse_model(s: &str) -> Result<Model, String> {
    Model::hardware()
        .iter()
        .copied()
        .find(|model| model.slug() == s)
        .ok_or_else(|| {
            let names: Vec<&str> = Model::hardware().iter().map(|m| m.slug()).collect();
            format!("unknown model '{s}', expected one of: {}", names.join(", "))
        })
}

fn parse_color(s: &str) -> Result<Rgba, String> {
    s.parse().map_err(|e: crate::error::DeckError| e.to_string())
}
