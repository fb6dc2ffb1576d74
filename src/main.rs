use clap::{Parser, Subcommand};
use log::warn;
use multisize::imaging::format::guess_mime;
use multisize::imaging::{PDF_MIME, RustBackend};
use multisize::{config, output, pipeline};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "multisize")]
#[command(version)]
#[command(about = "Generate resized derivatives of uploaded images")]
#[command(long_about = "\
Generate resized derivatives of uploaded images

Each upload is decoded once, optionally resized in place, then written out in
every size listed in [derivatives] specs, one spec per line:

  width|height|suffix|method

  300|0               300 wide, height from aspect ratio → photo-300w.jpg
  150|150|thumb|4     150x150 center crop                → photo-thumb.jpg
  50%||half           half the source width              → photo-half.jpg

Scale methods:
  1 passthrough   2 inside (default)   3 outside
  4 crop          5 crop+resize        6 fit (letterbox)

Supported inputs: JPEG, PNG, GIF. The output keeps the source format.

Run 'multisize gen-config' to generate a documented config.toml.")]
struct Cli {
    /// Config file (defaults apply to anything it leaves out)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resize one upload and write its derivatives
    Process {
        /// The uploaded file
        source: PathBuf,
        /// MIME type of the upload (guessed from the extension when omitted)
        #[arg(long)]
        mime: Option<String>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate the config and list the derivatives it would produce
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Process { source, mime, json } => {
            let config = config::load_config(cli.config.as_deref())?;
            init_thread_pool(&config.processing);
            let mime = mime.unwrap_or_else(|| guess_mime(&source).to_string());

            if mime.trim().eq_ignore_ascii_case(PDF_MIME) {
                println!(
                    "{}: no document compressor configured, left unchanged",
                    display_name(&source)
                );
                return Ok(());
            }

            for service in &config.compression.services {
                warn!("compression service {service:?} is not available in this build");
            }

            let settings = config.to_settings()?;
            let report = pipeline::process_upload(&RustBackend::new(), &source, &mime, &settings, &[])?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::print_report(&report);
            }
        }
        Command::Check => {
            let config = config::load_config(cli.config.as_deref())?;
            let settings = config.to_settings()?;
            output::print_settings(&settings);
            println!("==> Config is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores. Users can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
