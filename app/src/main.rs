use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::LevelFilter;

use rmhf_app::commands;
use rmhf_app::config::{self, AppConfig};

#[derive(Parser)]
#[command(name = "rmhf")]
#[command(version)]
#[command(about = "Preview and remove header/footer bands from PDF pages", long_about = None)]
struct Cli {
    /// Config file (defaults to <config dir>/rmhf/config.json)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the middle page with the bands highlighted
    Preview {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Header height in points
        #[arg(long, allow_hyphen_values = true)]
        top: Option<String>,

        /// Footer height in points
        #[arg(long, allow_hyphen_values = true)]
        bottom: Option<String>,

        /// Output PNG (temp dir if not specified)
        #[arg(short, long, value_name = "PNG")]
        output: Option<PathBuf>,

        /// Open the image with the system viewer
        #[arg(long)]
        open: bool,
    },

    /// Remove the bands from every page and save <stem><suffix>.pdf
    Redact {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Header height in points
        #[arg(long, allow_hyphen_values = true)]
        top: Option<String>,

        /// Footer height in points
        #[arg(long, allow_hyphen_values = true)]
        bottom: Option<String>,

        /// Output name suffix
        #[arg(long)]
        suffix: Option<String>,

        /// Skip checking the saved output
        #[arg(long)]
        no_verify: bool,
    },

    /// Show the effective config
    Config {
        /// Write the defaults to the config file
        #[arg(long)]
        init: bool,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_file = cli.config.as_deref();

    match cli.command {
        Commands::Preview {
            input,
            top,
            bottom,
            output,
            open,
        } => {
            let config = config::load_config(config_file)?;
            let path = commands::preview(
                &config,
                &input,
                top.as_deref(),
                bottom.as_deref(),
                output.as_deref(),
            )?;
            println!("{}", path.display());
            if open {
                open::that(&path)?;
            }
        }
        Commands::Redact {
            input,
            top,
            bottom,
            suffix,
            no_verify,
        } => {
            let mut config = config::load_config(config_file)?;
            if let Some(suffix) = suffix {
                config.suffix = suffix;
            }
            let outcome =
                commands::redact(&config, &input, top.as_deref(), bottom.as_deref(), !no_verify)?;
            println!(
                "{} ({} page(s), {} band(s), {} glyph(s) erased)",
                outcome.output_path.display(),
                outcome.page_count,
                outcome.bands_applied,
                outcome.glyphs_erased
            );
        }
        Commands::Config { init } => {
            let config = if init {
                let config = AppConfig::default();
                let path = config::save_config(config_file, &config)?;
                eprintln!("wrote {}", path.display());
                config
            } else {
                config::load_config(config_file)?
            };
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
