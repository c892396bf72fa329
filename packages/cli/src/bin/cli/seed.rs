// ABOUTME: Seed file and schema migration commands
// ABOUTME: Applies or reverts JSON seed batches and the settings table schema

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::*;
use setkeep_cli::AppContext;
use setkeep_settings::SettingsMigration;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum SeedCommands {
    /// Insert the settings declared in a JSON seed file
    Up {
        /// Path to the seed file (a JSON array of rows)
        file: PathBuf,
    },
    /// Delete the settings declared in a JSON seed file
    Down {
        file: PathBuf,
    },
}

pub async fn handle_seed_command(ctx: &AppContext, command: SeedCommands) -> Result<()> {
    match command {
        SeedCommands::Up { file } => seed_up(ctx, file).await,
        SeedCommands::Down { file } => seed_down(ctx, file).await,
    }
}

async fn seed_up(ctx: &AppContext, file: PathBuf) -> Result<()> {
    let migration = SettingsMigration::from_file(&file).await?;
    let report = migration.up(&ctx.pool).await?;

    for path in &report.inserted {
        println!("{} {}", "+".green(), path);
    }
    for skipped in &report.skipped {
        println!("{} {} {}", "~".yellow(), skipped.path, skipped.reason.dimmed());
    }
    println!(
        "Applied {}: {} inserted, {} skipped",
        migration.name().cyan(),
        report.inserted.len(),
        report.skipped.len()
    );

    Ok(())
}

async fn seed_down(ctx: &AppContext, file: PathBuf) -> Result<()> {
    let migration = SettingsMigration::from_file(&file).await?;
    let deleted = migration.down(&ctx.pool).await?;
    println!("Reverted {}: {} deleted", migration.name().cyan(), deleted);
    Ok(())
}

pub async fn schema_down(ctx: &AppContext, yes: bool) -> Result<()> {
    if !yes {
        bail!("Dropping the settings table deletes every setting; rerun with --yes");
    }
    setkeep_storage::revert_migrations(&ctx.pool).await?;
    println!("{}", "Settings table dropped".yellow());
    Ok(())
}
