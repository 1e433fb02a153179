use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::chart::surface::Theme;
use crate::error::{FindashError, Result};
use crate::fmt::money;
use crate::settings::{load_settings, save_settings, settings_path};

pub fn show() -> Result<()> {
    let s = load_settings();
    let mut table = Table::new();
    table.set_header(vec!["Setting", "Value"]);
    table.add_row(vec![Cell::new("Data file"), Cell::new(&s.data_file)]);
    table.add_row(vec![Cell::new("Initial balance"), Cell::new(money(s.initial_balance))]);
    table.add_row(vec![
        Cell::new("Theme"),
        Cell::new(match s.theme {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }),
    ]);
    table.add_row(vec![Cell::new("User name"), Cell::new(&s.user_name)]);
    table.add_row(vec![
        Cell::new("Blur amounts"),
        Cell::new(if s.blur_sensitive { "on" } else { "off" }),
    ]);
    table.add_row(vec![Cell::new("Ignored keywords"), Cell::new(s.ignores.join(", "))]);
    println!("Settings ({})\n{table}", settings_path().display());
    Ok(())
}

fn parse_switch(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        other => Err(FindashError::Settings(format!(
            "expected on or off, got '{other}'"
        ))),
    }
}

pub fn set(
    file: Option<String>,
    initial_balance: Option<f64>,
    theme: Option<String>,
    user_name: Option<String>,
    blur: Option<String>,
) -> Result<()> {
    let mut s = load_settings();
    if let Some(f) = file {
        s.data_file = f;
    }
    if let Some(b) = initial_balance {
        if !b.is_finite() {
            return Err(FindashError::Settings("initial balance must be a number".into()));
        }
        s.initial_balance = b;
    }
    if let Some(t) = theme {
        s.theme = Theme::parse(&t)
            .ok_or_else(|| FindashError::Settings(format!("unknown theme '{t}' (dark or light)")))?;
    }
    if let Some(name) = user_name {
        s.user_name = name.trim().to_string();
    }
    if let Some(b) = blur {
        s.blur_sensitive = parse_switch(&b)?;
    }
    save_settings(&s)?;
    println!("{} Settings saved.", "✓".green());
    Ok(())
}

pub fn ignore_add(keyword: &str) -> Result<()> {
    let mut s = load_settings();
    if s.add_ignore(keyword) {
        save_settings(&s)?;
        println!("Ignoring rows matching '{}'.", keyword.trim());
    } else {
        println!("'{}' is already ignored.", keyword.trim());
    }
    Ok(())
}

pub fn ignore_remove(keyword: &str) -> Result<()> {
    let mut s = load_settings();
    if !s.remove_ignore(keyword) {
        return Err(FindashError::Settings(format!(
            "'{}' is not in the ignore list",
            keyword.trim()
        )));
    }
    save_settings(&s)?;
    println!("No longer ignoring '{}'.", keyword.trim());
    Ok(())
}

pub fn ignore_list() -> Result<()> {
    let s = load_settings();
    if s.ignores.is_empty() {
        println!("No ignored keywords.");
    }
    for k in &s.ignores {
        println!("  {k}");
    }
    Ok(())
}
