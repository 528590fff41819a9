use clap::{Parser, Subcommand};
use gallery_ingest::config::{self, GalleryConfig, PathOverrides};
use gallery_ingest::{output, pipeline, server};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gallery-ingest")]
#[command(about = "Turn a folder of bridal photos and videos into a web gallery")]
#[command(long_about = "\
Turn a folder of bridal photos and videos into a web gallery

The input directory is the data source. Filenames say where each file goes:

  public/gallery/
  ├── Bride_Aish_1.jpg        # subject \"aish\", slot 1
  ├── Aish_2.mov              # prefix optional → subject \"aish\", slot 2
  ├── Raadhya Reception 1.heic
  ├── Collection_1.png        # explicit collection slot
  ├── IMG_0007.jpg            # camera name → collection
  └── bride_aish_1.avif       # derivative from an earlier run

Each subject shows at most 3 slots. Images become AVIF, videos become
H.264 MP4 with an AVIF poster; every item gets a tiny inline preview,
alt text, hashtags and an optional badge. The result is written to the
manifest JSON the site renders from.

Run 'gallery-ingest gen-config' to generate a documented gallery.toml.")]
#[command(version)]
struct Cli {
    /// Config file (optional unless given explicitly)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Raw input directory
    #[arg(long, global = true)]
    input: Option<PathBuf>,

    /// Derivative output directory (defaults to the input directory)
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Manifest JSON path
    #[arg(long, global = true)]
    manifest: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Transcode the input directory and rewrite the manifest (default)
    Build {
        /// Ignore the transcode cache and re-encode everything
        #[arg(long)]
        no_cache: bool,
    },
    /// Classify the input directory and print the plan without transcoding
    Check,
    /// Serve the admin upload/delete API
    Serve {
        /// Address to listen on (overrides [server] bind)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Print a stock gallery.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match cli.command.take().unwrap_or(Command::Build { no_cache: false }) {
        Command::Build { no_cache } => {
            let config = resolve_config(&cli)?;
            println!("==> Building {}", config.input_dir().display());
            let report = pipeline::build(&config, !no_cache)?;
            output::print_build_report(&report);
        }
        Command::Check => {
            let config = resolve_config(&cli)?;
            let input = config.input_dir();
            println!("==> Checking {}", input.display());
            let (scanned, plan) = pipeline::plan_directory(&input)?;
            output::print_plan(&scanned, &plan);
        }
        Command::Serve { bind } => {
            let config = resolve_config(&cli)?;
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::serve(config, &bind))?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the config file, then apply the path flags on top.
///
/// Without `--config`, a missing `gallery.toml` just means stock defaults.
fn resolve_config(cli: &Cli) -> Result<GalleryConfig, config::ConfigError> {
    let (path, required) = match &cli.config {
        Some(path) => (path.clone(), true),
        None => (PathBuf::from(config::DEFAULT_CONFIG_FILE), false),
    };
    let mut config = config::load_config(&path, required)?;
    config.apply_overrides(&PathOverrides {
        input: cli.input.clone(),
        output: cli.output.clone(),
        manifest: cli.manifest.clone(),
    });
    config.validate()?;
    Ok(config)
}
