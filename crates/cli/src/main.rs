mod commands;
mod watch;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tempo", about = "tempo CLI - track work sessions against estimates")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the active session and its elapsed time
    Status,

    /// Start tracking an estimate (stops any other active session first)
    Start {
        /// Estimate id to track against
        #[arg(long)]
        estimate: String,
        /// Task the estimate belongs to
        #[arg(long)]
        task: String,
        /// Client the estimate belongs to
        #[arg(long)]
        client: String,
        /// Product the task is billed under
        #[arg(long)]
        product: Option<String>,
    },

    /// Stop the active session (no-op when nothing is running)
    Stop {
        /// Only stop if this estimate is the one running
        #[arg(long)]
        estimate: Option<String>,
    },

    /// List past sessions for an estimate
    History {
        #[arg(long)]
        estimate: String,
    },

    /// Run the live coordinator: header widget + task board, re-rendered
    /// on every change until Ctrl-C
    Watch {
        /// Board rows as ESTIMATE:TASK:CLIENT[:ESTIMATED_MINUTES],
        /// repeatable
        #[arg(long = "row")]
        rows: Vec<String>,
    },

    /// Show or set configuration
    Config {
        /// Set the server URL
        #[arg(long)]
        server: Option<String>,
        /// Set the API key
        #[arg(long)]
        api_key: Option<String>,
        /// Set the authenticated user id
        #[arg(long)]
        user_id: Option<i64>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tempo=info".parse().unwrap())
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Status => commands::run_status().await,
        Commands::Start {
            estimate,
            task,
            client,
            product,
        } => commands::run_start(estimate, task, client, product).await,
        Commands::Stop { estimate } => commands::run_stop(estimate).await,
        Commands::History { estimate } => commands::run_history(&estimate).await,
        Commands::Watch { rows } => watch::run_watch(&rows).await,
        Commands::Config {
            server,
            api_key,
            user_id,
        } => commands::run_config(server, api_key, user_id),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
