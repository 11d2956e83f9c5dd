use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "callboard")]
#[command(version, about = "Phone-number call board with a live status feed")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Plain-text call list, one number per line
    #[arg(
        long,
        global = true,
        env = "CALLBOARD_NUMBERS_FILE",
        default_value = "numbers.txt"
    )]
    pub numbers_file: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the web panel
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to serve on
        #[arg(short, long, default_value = "5000")]
        port: u16,

        /// Open the panel in a browser once the server is up
        #[arg(long)]
        open: bool,

        /// Enable dev mode (permissive CORS)
        #[arg(long)]
        dev: bool,
    },
    /// Print the call list
    List,
    /// Add a number to the call list
    Add { number: String },
    /// Remove a number from the call list
    Remove { number: String },
    /// Call every listed number in the foreground, printing each status
    Call,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env must be loaded before parsing so it can feed `env` fallbacks.
    callboard::config::load_dotenv();
    let cli = Cli::parse();
    callboard::logging::init_logger(cli.verbose);

    match &cli.command {
        Commands::Serve {
            host,
            port,
            open,
            dev,
        } => cmd::cmd_serve(host.clone(), *port, cli.numbers_file.clone(), *open, *dev).await?,
        Commands::List => cmd::cmd_list(&cli.numbers_file).await?,
        Commands::Add { number } => cmd::cmd_add(&cli.numbers_file, number).await?,
        Commands::Remove { number } => cmd::cmd_remove(&cli.numbers_file, number).await?,
        Commands::Call => cmd::cmd_call(cli.numbers_file.clone()).await?,
    }

    Ok(())
}
