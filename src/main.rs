//! deckhand - drive Elgato Stream Deck devices from the command line.
#![forbid(unsafe_code)]

use std::fs;
use std::io::{self, IsTerminal};
use std::time::{Duration, Instant};

use clap::Parser;
use console::style;
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use deckhand::cli::{Cli, Commands, CompletionsArgs, DeckSource, InfoArgs, ProfilesArgs, RenderArgs, RunArgs};
use deckhand::config::Settings;
use deckhand::device::DeckEvent;
use deckhand::error::ResultExt;
use deckhand::icon::{Icon, IconRenderer};
use deckhand::logging::init_logging;
use deckhand::manager::{DeckManager, deliver_switches};
use deckhand::{Deck, DeckError, Result};

/// Build information embedded at compile time.
mod build_info {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    pub fn git_sha() -> &'static str {
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown")
    }

    pub fn git_dirty() -> &'static str {
        option_env!("VERGEN_GIT_DIRTY").unwrap_or("false")
    }

    pub fn build_timestamp() -> &'static str {
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown")
    }

    pub fn rustc_semver() -> &'static str {
        option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown")
    }

    pub fn target() -> &'static str {
        option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown")
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.no_color || !io::stdout().is_terminal() {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }
    init_logging(cli.use_json(), cli.verbose, cli.quiet);

    if let Err(e) = run(&cli) {
        output_error(&cli, &e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        None => {
            print_quick_start();
            Ok(())
        }
        Some(Commands::Version) => cmd_version(cli),
        Some(Commands::Completions(args)) => cmd_completions(args),
        Some(command) => {
            let settings = Settings::load(cli.config.as_deref())?;
            debug!(?settings, "Loaded settings");
            match command {
                Commands::List => cmd_list(cli, &settings),
                Commands::Info(args) => cmd_info(cli, settings, args),
                Commands::Profiles(args) => cmd_profiles(cli, settings, args),
                Commands::Run(args) => cmd_run(cli, settings, args),
                Commands::Render(args) => cmd_render(cli, &settings, args),
                Commands::Version | Commands::Completions(_) => Ok(()),
            }
        }
    }
}

fn print_quick_start() {
    println!(
        "{} {} - Stream Deck driver\n",
        style("deckhand").bold().cyan(),
        build_info::VERSION
    );
    println!("{}", style("QUICK START").bold().underlined());
    println!();
    println!("  {}  List attached decks", style("deckhand list").green());
    println!("  {}  Device information", style("deckhand info").green());
    println!("  {}  Show profiles", style("deckhand profiles").green());
    println!("  {}  Drive every deck", style("deckhand run").green());
    println!("  {}  Try it without hardware", style("deckhand run --fake 2").green());
    println!();
    println!("Run {} for full help", style("deckhand --help").yellow());
}

// === Deck Selection ===

fn open_decks(manager: &DeckManager, source: DeckSource) -> Result<Vec<Deck>> {
    let configured = manager.settings().fake_devices;
    let fake = source.fake.or((configured > 0).then_some(configured));

    let decks = match fake {
        Some(count) => manager.enumerate_fake(count),
        None => manager.enumerate()?,
    };
    if decks.is_empty() {
        return Err(DeckError::NoDevicesFound);
    }
    Ok(decks)
}

/// Pick the deck named by `--serial`, or the only deck.
fn select_deck(cli: &Cli, decks: Vec<Deck>) -> Result<Deck> {
    if let Some(serial) = &cli.serial {
        return decks
            .into_iter()
            .find(|deck| deck.serial() == serial)
            .ok_or_else(|| DeckError::DeviceNotFound {
                serial: serial.clone(),
            });
    }

    let count = decks.len();
    let mut decks = decks.into_iter();
    match (decks.next(), count) {
        (Some(deck), 1) => Ok(deck),
        (Some(_), _) => Err(DeckError::Other(format!(
            "{count} decks attached; choose one with --serial"
        ))),
        (None, _) => Err(DeckError::NoDevicesFound),
    }
}

// === Commands ===

#[derive(Serialize)]
struct ListedDevice {
    model: &'static str,
    product_id: String,
    serial: Option<String>,
    path: String,
}

fn cmd_list(cli: &Cli, settings: &Settings) -> Result<()> {
    let manager = DeckManager::new(settings.clone());
    let listed: Vec<ListedDevice> = manager
        .scan()?
        .into_iter()
        .filter_map(|device| {
            let model = device.model().ok()?;
            Some(ListedDevice {
                model: model.display_name(),
                product_id: format!("{:#06x}", device.product_id),
                serial: device.serial,
                path: device.path,
            })
        })
        .collect();

    if cli.use_json() {
        output_json(cli, &listed);
        return Ok(());
    }
    if listed.is_empty() {
        println!("{}", style("No Stream Deck devices found").yellow());
        return Ok(());
    }
    for device in &listed {
        println!(
            "{}  {}  {}",
            style(device.serial.as_deref().unwrap_or("-")).bold(),
            device.model,
            style(&device.product_id).dim()
        );
    }
    Ok(())
}

fn cmd_info(cli: &Cli, settings: Settings, args: &InfoArgs) -> Result<()> {
    let manager = DeckManager::new(settings);
    let deck = select_deck(cli, open_decks(&manager, args.source)?)?;
    let info = deck.info();

    if cli.use_json() {
        output_json(cli, &info);
        return Ok(());
    }
    println!("{}", style(&info.product_name).bold());
    println!("  serial:     {}", info.serial);
    println!("  firmware:   {}", info.firmware_version);
    println!("  keys:       {} ({}x{})", info.button_count, info.columns, info.rows);
    if info.dial_count > 0 {
        println!("  dials:      {}", info.dial_count);
    }
    if let Some((width, height)) = info.icon_size {
        println!("  key image:  {width}x{height}");
    }
    println!("  profile:    {}", deck.active_profile().name());
    Ok(())
}

fn cmd_profiles(cli: &Cli, settings: Settings, args: &ProfilesArgs) -> Result<()> {
    let manager = DeckManager::new(settings);
    let mut deck = select_deck(cli, open_decks(&manager, args.source)?)?;

    if let Some(name) = &args.add {
        let id = deck.add_profile(name);
        info!(%id, name = %name, "Added profile");
    }
    if let Some([id, name]) = args.rename.as_deref() {
        deck.rename_profile(id, name)?;
    }
    if let Some(id) = &args.activate {
        deck.load_profile(id)?;
    }
    if let Some(id) = &args.remove {
        deck.remove_profile(id)?;
    }

    let profiles = deck.profiles();
    if cli.use_json() {
        output_json(cli, &profiles);
    } else {
        for profile in &profiles {
            let marker = if profile.active { "*" } else { " " };
            println!(
                "{} {}  {}  brightness {:.0}%",
                style(marker).green().bold(),
                style(&profile.name).bold(),
                style(&profile.id).dim(),
                profile.brightness * 100.0
            );
        }
    }
    Ok(())
}

fn cmd_run(cli: &Cli, settings: Settings, args: &RunArgs) -> Result<()> {
    let period = settings.poll_interval();
    let manager = DeckManager::new(settings);
    let mut decks = open_decks(&manager, args.source)?;
    let timeout = args.timeout.map(Duration::from_secs);

    if !cli.use_json() {
        for deck in &decks {
            eprintln!(
                "{} {} ({})",
                style("Driving").green().bold(),
                deck.info().product_name,
                deck.serial()
            );
        }
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(drive(cli, &mut decks, period, timeout));

    info!(count = decks.len(), "Closing decks");
    Ok(())
}

/// Poll every deck until Ctrl-C or the timeout.
async fn drive(cli: &Cli, decks: &mut [Deck], period: Duration, timeout: Option<Duration>) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let stop = async {
        match timeout {
            Some(timeout) => tokio::time::sleep(timeout).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(stop);
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    loop {
        tokio::select! {
            _ = ticker.tick() => poll_all(cli, decks),
            result = &mut interrupted => {
                if let Err(e) = result {
                    debug!(error = %e, "Ctrl-C handler failed");
                }
                info!("Interrupted");
                break;
            }
            () = &mut stop => {
                debug!("Timeout reached");
                break;
            }
        }
    }
}

#[derive(Serialize)]
struct EventLine<'a> {
    serial: &'a str,
    #[serde(flatten)]
    event: &'a DeckEvent,
}

fn poll_all(cli: &Cli, decks: &mut [Deck]) {
    let now = Instant::now();
    let mut switches = Vec::new();

    for deck in decks.iter_mut() {
        for event in deck.poll(now) {
            if cli.use_json() {
                output_json(cli, &EventLine { serial: deck.serial(), event: &event });
            } else {
                println!("{} {}", style(deck.serial()).dim(), describe_event(&event));
            }
        }
        switches.extend(deck.take_forwarded());
    }

    deliver_switches(decks, switches);
}

fn describe_event(event: &DeckEvent) -> String {
    match event {
        DeckEvent::ButtonPressed { position } => format!("key {position} pressed"),
        DeckEvent::ButtonReleased { position } => format!("key {position} released"),
        DeckEvent::DialRotated { dial, delta } => format!("dial {dial} turned {delta:+}"),
        DeckEvent::DialPressed { dial } => format!("dial {dial} pressed"),
        DeckEvent::DialReleased { dial } => format!("dial {dial} released"),
        DeckEvent::Touch(touch) => format!("touch at {},{}", touch.x, touch.y),
    }
}

fn cmd_render(cli: &Cli, settings: &Settings, args: &RenderArgs) -> Result<()> {
    let layout = args.model.icon_layout().ok_or_else(|| {
        DeckError::Other(format!("{} has no display", args.model.display_name()))
    })?;

    let mut icon_dirs = args.icon_dir.clone();
    icon_dirs.extend(settings.icon_dirs.iter().cloned());
    let renderer = IconRenderer::new(layout, icon_dirs);

    let icon = Icon {
        background_color: args.background.unwrap_or_default(),
        file: args.file.clone(),
        icon_name: args.icon_name.clone(),
        text: args.text.clone(),
        ..Icon::default()
    };
    let data = renderer.render(Some(&icon), None)?;
    fs::write(&args.output, &data).with_context(|| format!("Writing {}", args.output.display()))?;

    if cli.use_json() {
        output_json(
            cli,
            &serde_json::json!({
                "output": args.output,
                "bytes": data.len(),
                "format": layout.format,
                "width": layout.width,
                "height": layout.height,
            }),
        );
    } else {
        println!(
            "{} {} ({} bytes, {}x{})",
            style("Wrote").green().bold(),
            args.output.display(),
            data.len(),
            layout.width,
            layout.height
        );
    }
    Ok(())
}

#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn cmd_version(cli: &Cli) -> Result<()> {
    if cli.use_json() {
        output_json(
            cli,
            &serde_json::json!({
                "version": build_info::VERSION,
                "git_sha": build_info::git_sha(),
                "git_dirty": build_info::git_dirty() == "true",
                "build_timestamp": build_info::build_timestamp(),
                "rustc_version": build_info::rustc_semver(),
                "target": build_info::target(),
            }),
        );
    } else {
        println!("deckhand {}", build_info::VERSION);
        println!(
            "git: {}{}",
            build_info::git_sha(),
            if build_info::git_dirty() == "true" {
                " (dirty)"
            } else {
                ""
            }
        );
        println!("built: {}", build_info::build_timestamp());
        println!("rustc: {}", build_info::rustc_semver());
        println!("target: {}", build_info::target());
    }
    Ok(())
}

#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn cmd_completions(args: &CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    clap_complete::generate(args.shell, &mut Cli::command(), "deckhand", &mut io::stdout());
    Ok(())
}

// === Output ===

fn output_json<T: Serialize>(cli: &Cli, data: &T) {
    let json = if cli.use_compact_json() {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    match json {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Failed to serialize output: {e}"),
    }
}

fn output_error(cli: &Cli, error: &DeckError) {
    if cli.use_json() {
        let json = serde_json::json!({
            "error": true,
            "message": error.to_string(),
            "suggestion": error.suggestion(),
            "recoverable": error.is_user_recoverable(),
        });
        eprintln!("{json:#}");
    } else {
        eprintln!("{}: {}", style("Error").red().bold(), error);
        if let Some(suggestion) = error.suggestion() {
            eprintln!("{}: {}", style("Hint").yellow(), suggestion);
        }
    }
}
