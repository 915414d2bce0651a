// Layoutfix CLI
// Hotkey daemon that retypes text typed in the wrong keyboard layout

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use layoutfix_core::{Config, Transliterator};

/// Retype selected text typed in the wrong keyboard layout
#[derive(Parser, Debug)]
#[command(name = "layoutfix")]
#[command(author = "layoutfix contributors")]
#[command(version)]
#[command(about = "Retype text typed in the wrong keyboard layout", long_about = None)]
struct Args {
    /// TOML configuration file (default: <config dir>/layoutfix/config.toml)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Validate config and exit
    #[arg(long)]
    check_config: bool,

    /// Print a commented default configuration and exit
    #[arg(long)]
    print_default_config: bool,

    /// List configured hotkeys and exit
    #[arg(long)]
    list_hotkeys: bool,
}

fn init_logging(debug: bool) {
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    // RUST_LOG, when set, takes precedence
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_millis()
        .init();
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    Config::load(args.config.as_deref()).with_context(|| match &args.config {
        Some(path) => format!("failed to load config {}", path.display()),
        None => "failed to load default config".to_string(),
    })
}

fn print_hotkeys(config: &Config) {
    for binding in config.dispatcher().bindings() {
        println!("{:>3}  {:<16} {}", binding.id, binding.display_name(), binding.action);
    }
}

fn check_config(config: &Config) -> anyhow::Result<()> {
    Transliterator::from_config(config)?;
    println!("Configuration is valid");
    println!(
        "  layouts: {} ({}) <-> {} ({})",
        config.primary.name, config.primary.id, config.secondary.name, config.secondary.id
    );
    println!("  keymap entries: {}", config.keymap.len());
    println!("  hotkeys: {}", config.hotkeys.len());
    Ok(())
}

#[cfg(windows)]
fn run(config: &Config) -> anyhow::Result<()> {
    use layoutfix_core::platform::{
        MessageLoop, Win32Clipboard, Win32Hotkeys, Win32Input, Win32Layouts,
    };
    use layoutfix_core::{register_all, unregister_all, Services, SystemClock};

    let mut transliterator = Transliterator::from_config(config)?;

    let message_loop = MessageLoop::new();
    let mut hotkeys = Win32Hotkeys::new();
    let registered = register_all(&config.hotkeys, &mut hotkeys)?;

    let quit = message_loop.quit_handle();
    if let Err(e) = ctrlc::set_handler(move || quit.quit()) {
        log::warn!("Could not install Ctrl+C handler: {}", e);
    }

    log::info!(
        "Listening for {} hotkeys ({} <-> {})",
        registered.len(),
        config.primary.name,
        config.secondary.name
    );

    let mut clipboard = Win32Clipboard::new();
    let mut input = Win32Input::new();
    let mut layouts = Win32Layouts::new();
    let clock = SystemClock;

    message_loop.run(|id| {
        let mut services = Services {
            clipboard: &mut clipboard,
            input: &mut input,
            layout: &mut layouts,
            clock: &clock,
        };
        let outcome = transliterator.handle_hotkey(id, &mut services);
        log::debug!("hotkey #{} -> {:?}", id, outcome);
    });

    unregister_all(&registered, &mut hotkeys);
    Ok(())
}

#[cfg(not(windows))]
fn run(_config: &Config) -> anyhow::Result<()> {
    anyhow::bail!("no keyboard backend for this platform; only Windows is supported")
}

#[cfg(windows)]
fn report_fatal(error: &anyhow::Error) {
    layoutfix_core::platform::show_fatal_error("layoutfix", &format!("{:#}", error));
}

#[cfg(not(windows))]
fn report_fatal(error: &anyhow::Error) {
    eprintln!("Error: {:#}", error);
}

fn try_main(args: Args) -> anyhow::Result<()> {
    if args.print_default_config {
        print!("{}", layoutfix_core::config::default_config_content());
        return Ok(());
    }

    let config = load_config(&args)?;
    init_logging(args.verbose || config.debug);

    if args.list_hotkeys {
        print_hotkeys(&config);
        return Ok(());
    }

    if args.check_config {
        return check_config(&config);
    }

    run(&config)
}

fn main() {
    let args = Args::parse();
    if let Err(e) = try_main(args) {
        report_fatal(&e);
        std::process::exit(1);
    }
}
