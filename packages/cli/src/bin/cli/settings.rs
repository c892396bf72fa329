// ABOUTME: Setting lookup and editing commands
// ABOUTME: Renders section forms as tables and routes writes through the settings service

use anyhow::{bail, Result};
use colored::*;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};
use setkeep_cli::AppContext;
use setkeep_settings::{Flash, FormView, Resolved, SettingsError, Submission, UploadedFile};
use std::path::PathBuf;

const EMPTY: &str = "-";

pub async fn list_sections(ctx: &AppContext) -> Result<()> {
    let sections = ctx.storage().list_sections().await?;

    if sections.is_empty() {
        println!("{}", "No settings found".yellow());
        println!("{}", "Use 'setkeep seed up <file>' to add settings".dimmed());
        return Ok(());
    }

    for section in &sections {
        let count = ctx.storage().find_by_section(section).await?.len();
        let last = ctx
            .storage()
            .max_position(section)
            .await?
            .map_or_else(|| EMPTY.to_string(), |p| p.to_string());
        println!(
            "{} {}",
            section.cyan(),
            format!("({} settings, last position {})", count, last).dimmed()
        );
    }

    Ok(())
}

pub async fn show_section(ctx: &AppContext, section: &str, json: bool) -> Result<()> {
    let page = ctx.service.handle_section(section, None).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&page.form)?);
    } else {
        print_form(&page.form);
    }
    Ok(())
}

pub async fn get_value(ctx: &AppContext, path: &str, default: Option<&str>) -> Result<()> {
    match ctx.service.resolver().get(path, default).await? {
        Resolved::Value(value) => println!("{}", value.unwrap_or_default()),
        Resolved::Section(values) => {
            if values.is_empty() {
                bail!(SettingsError::SectionNotFound(path.to_string()));
            }
            for (key, value) in values {
                println!("{} = {}", key.cyan(), value.unwrap_or_default());
            }
        }
    }
    Ok(())
}

pub async fn set_value(ctx: &AppContext, path: &str, value: &str) -> Result<()> {
    if !ctx.service.resolver().set(path, Some(value)).await? {
        bail!(SettingsError::PersistenceFailed(format!("{} was not updated", path)));
    }
    println!("{} {}", "Updated".green(), path);
    Ok(())
}

pub async fn submit_section(
    ctx: &AppContext,
    section: &str,
    values: Vec<(String, String)>,
    files: Vec<(String, PathBuf)>,
) -> Result<()> {
    let mut submission = Submission::new();
    submission.values.extend(values);
    for (key, path) in files {
        let file = UploadedFile::from_path(&path).await?;
        submission.files.insert(key, file);
    }

    let page = ctx.service.handle_section(section, Some(submission)).await?;

    match &page.flash {
        Some(Flash::Success(message)) => println!("{}", message.green().bold()),
        Some(Flash::Error(message)) => {
            print_form(&page.form);
            bail!("{}", message);
        }
        None => {}
    }

    Ok(())
}

fn print_form(form: &FormView) {
    println!("{}", format!("Section: {}", form.section).blue().bold());
    println!();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec!["Key", "Name", "Value", "Type", "Options", "Hint"]);

    for field in &form.fields {
        let options = if field.options.is_empty() {
            EMPTY.to_string()
        } else {
            field
                .options
                .iter()
                .map(|o| format!("{}={}", o.value, o.label))
                .collect::<Vec<_>>()
                .join(", ")
        };

        table.add_row(vec![
            field.key.clone(),
            field.label.clone(),
            field.value.clone().unwrap_or_default(),
            field.widget.as_str().to_string(),
            options,
            field.hint.clone().unwrap_or_else(|| EMPTY.to_string()),
        ]);
    }

    println!("{}", table);

    for field in form.fields.iter().filter(|f| !f.errors.is_empty()) {
        for error in &field.errors {
            eprintln!("  {} {}", format!("{}:", field.key).red(), error);
        }
    }
}
