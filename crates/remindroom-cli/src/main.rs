use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "remindroom-cli", version, about = "Remindroom CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reminder management
    Reminder {
        #[command(subcommand)]
        action: commands::reminder::ReminderAction,
    },
    /// Alert sound settings
    Sound {
        #[command(subcommand)]
        action: commands::sound::SoundAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Reminder counts
    Stats,
    /// Run the reminder engine in the foreground
    Watch(commands::watch::WatchArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Reminder { action } => commands::reminder::run(action),
        Commands::Sound { action } => commands::sound::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Stats => commands::stats::run(),
        Commands::Watch(args) => commands::watch::run(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
