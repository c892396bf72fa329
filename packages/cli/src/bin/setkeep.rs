use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::process;

mod cli;

use cli::seed::SeedCommands;
use setkeep_cli::{parse_assignment, AppContext};

#[derive(Parser)]
#[command(name = "setkeep")]
#[command(about = "Setkeep CLI - section-scoped application settings")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// Revert the schema, dropping the settings table
    Down {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum Commands {
    /// List every section
    Sections,
    /// Show the settings form for a section
    Show {
        /// Section name
        section: String,
        /// Print the form as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a value (`section.key`) or a whole section (`section`)
    Get {
        path: String,
        /// Printed when the stored value is empty
        #[arg(short, long)]
        default: Option<String>,
    },
    /// Store a single value without running the section's validators
    Set {
        /// `section.key`
        path: String,
        value: String,
    },
    /// Validate and save several values of a section at once
    Submit {
        section: String,
        /// `key=value` pairs
        #[arg(value_parser = parse_assignment)]
        values: Vec<(String, String)>,
        /// `key=path` of a file to upload for a file setting
        #[arg(long = "file", value_parser = parse_assignment)]
        files: Vec<(String, String)>,
    },
    /// Apply or revert a JSON seed file
    #[command(subcommand)]
    Seed(SeedCommands),
    /// Manage the database schema
    #[command(subcommand)]
    Schema(SchemaCommands),
}

#[tokio::main]
async fn main() {
    setkeep_cli::init_logging();
    let cli = Cli::parse();

    match handle_command(cli.command).await {
        Ok(_) => {}
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            process::exit(1);
        }
    }
}

async fn handle_command(command: Commands) -> anyhow::Result<()> {
    let ctx = AppContext::from_env().await?;

    match command {
        Commands::Sections => cli::settings::list_sections(&ctx).await,
        Commands::Show { section, json } => {
            cli::settings::show_section(&ctx, &section, json).await
        }
        Commands::Get { path, default } => {
            cli::settings::get_value(&ctx, &path, default.as_deref()).await
        }
        Commands::Set { path, value } => cli::settings::set_value(&ctx, &path, &value).await,
        Commands::Submit {
            section,
            values,
            files,
        } => {
            let files = files
                .into_iter()
                .map(|(key, path)| (key, PathBuf::from(path)))
                .collect();
            cli::settings::submit_section(&ctx, &section, values, files).await
        }
        Commands::Seed(seed_cmd) => cli::seed::handle_seed_command(&ctx, seed_cmd).await,
        Commands::Schema(SchemaCommands::Down { yes }) => cli::seed::schema_down(&ctx, yes).await,
    }
}
