use anyhow::Result;
use clap::Parser;
use pyri::runtime::RealRuntime;
use std::path::PathBuf;

/// pyri - PyPI Requirement Installer
///
/// Download Python distribution artifacts from a PyPI-style index and unpack
/// them into a destination directory.
///
/// Examples:
///   pyri fetch requirements.txt          # Materialize every pinned requirement
///   pyri download hvac --version 0.10.1  # Download one artifact, keep it packed
#[derive(Parser, Debug)]
#[command(author, version = env!("PYRI_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Destination directory (defaults to the current directory; also via PYRI_DEST)
    #[arg(
        long = "dest",
        short = 'd',
        env = "PYRI_DEST",
        value_name = "PATH",
        global = true
    )]
    pub dest: Option<PathBuf>,

    /// Package index URL (defaults to https://pypi.org)
    #[arg(long = "index-url", value_name = "URL", global = true)]
    pub index_url: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Download and unpack every requirement pinned in a manifest
    Fetch(FetchArgs),

    /// Download a single package artifact without unpacking it
    Download(DownloadArgs),
}

#[derive(clap::Args, Debug)]
pub struct FetchArgs {
    /// Path to the requirements manifest
    #[arg(value_name = "REQUIREMENTS")]
    pub manifest: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct DownloadArgs {
    /// The package name as known to the index
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Exact version to download (defaults to the latest release)
    #[arg(long, value_name = "VERSION")]
    pub version: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let runtime = RealRuntime;

    match cli.command {
        Commands::Fetch(args) => {
            pyri::fetch::fetch_manifest(runtime, &args.manifest, cli.dest, cli.index_url).await?
        }
        Commands::Download(args) => {
            pyri::fetch::download_package(
                runtime,
                &args.name,
                args.version.as_deref(),
                cli.dest,
                cli.index_url,
            )
            .await?
        }
    }
    Ok(())
}
