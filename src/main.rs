// Entrypoint for the CLI application.
// - Keeps `main` small: parse arguments, create a Synapse client and
//   hand both to the uploader.
// - Returns `anyhow::Result` so any login, filesystem or remote error
//   aborts the run with a non-zero exit.

use anyhow::Result;
use clap::Parser;
use synup::api::SynapseClient;
use synup::mirror::Uploader;

/// Mirror a local directory tree into a Synapse project.
#[derive(Parser)]
#[command(name = "synup", version)]
struct Cli {
    /// Synapse Project ID to upload to (e.g., syn123456789).
    project_id: String,

    /// Path of the folder to upload.
    local_folder_path: String,

    /// Folder to upload to in Synapse.
    #[arg(short = 'r', long)]
    remote_folder_path: Option<String>,

    /// Dry run only. Do not upload any folders or files.
    #[arg(short = 'd', long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    // Diagnostic logging is opt-in via RUST_LOG; progress lines go to
    // stdout regardless.
    env_logger::init();

    let cli = Cli::parse();

    // The client reads its endpoint from the environment variable
    // `SYNAPSE_BASE_URL` or defaults to the production Synapse API.
    // See `api::SynapseClient::from_env`.
    let client = SynapseClient::from_env()?;

    Uploader::new(
        client,
        cli.project_id,
        cli.local_folder_path,
        cli.remote_folder_path.as_deref(),
        cli.dry_run,
    )
    .start()
}
