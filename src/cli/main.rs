mod client;

use crate::client::Api;
use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base url of the doppler ui server.
    #[arg(short, long, default_value = "http://127.0.0.1:5173", env = "DOPPLER_UI_TARGET")]
    target: String,
    /// Path to the TLS cert of the server, when it runs with one.
    #[arg(short, long)]
    cert_path: Option<String>,
    /// Command to run.
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the configured node connections.
    Connections,
    /// Fetch the reconciled channel graph of all configured nodes.
    Graph,
    /// Show the tree of saved doppler scripts.
    ListScripts,
    /// Print a saved script.
    Download {
        /// Path relative to the scripts folder.
        #[arg(long)]
        path: String,
    },
    /// Save a local file as a doppler script.
    Save {
        /// Path relative to the scripts folder.
        #[arg(long)]
        path: String,
        /// Local file with the script content.
        #[arg(long)]
        file: String,
        #[arg(long, default_value = "cli")]
        id: String,
    },
    /// Run a saved script in the background.
    Run {
        /// Run id, the output goes to <id>.log.
        #[arg(long)]
        id: String,
        /// Path relative to the scripts folder.
        #[arg(long)]
        path: String,
    },
    /// Reset the network.
    Reset {
        /// Run id, a fresh one is generated when missing.
        #[arg(long)]
        id: Option<String>,
    },
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run_command(args) {
        eprintln!("Error executing command: {e}");
        std::process::exit(1);
    }
}

fn run_command(args: Args) -> Result<()> {
    let api = Api::new(&args.target, args.cert_path.as_deref())?;
    let output = match args.command {
        Command::Connections => api.get_connections()?,
        Command::Graph => api.get_graph()?,
        Command::ListScripts => api.list_scripts()?,
        Command::Download { path } => api.download(&path)?,
        Command::Save { path, file, id } => api.save(id, path, &file)?,
        Command::Run { id, path } => api.run(id, path)?,
        Command::Reset { id } => api.reset(id)?,
    };
    println!("{output}");
    Ok(())
}
