//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;

/// Display sentinel for an unavailable prediction
pub const UNAVAILABLE: &str = "예측 불가";

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format an optional RUL estimate in hours
pub fn format_rul(rul: Option<f32>) -> String {
    match rul {
        Some(hours) => format!("{:.1}h", hours),
        None => UNAVAILABLE.to_string(),
    }
}

/// Format an optional binary downtime-risk label
pub fn format_risk(risk: Option<u8>) -> String {
    match risk {
        Some(0) => "low".to_string(),
        Some(_) => "HIGH".to_string(),
        None => UNAVAILABLE.to_string(),
    }
}

/// Failure label as shown to the operator
pub fn format_failure_type(failure_type: Option<&str>) -> String {
    failure_type.unwrap_or(UNAVAILABLE).to_string()
}

/// Color the maintenance verdict
pub fn color_maintenance(required: bool) -> String {
    if required {
        "MAINTENANCE".red().bold().to_string()
    } else {
        "ok".green().to_string()
    }
}

/// Color an optional RUL against the 20 hour maintenance threshold
pub fn color_rul(rul: Option<f32>) -> String {
    let formatted = format_rul(rul);
    match rul {
        Some(hours) if hours <= 20.0 => formatted.red().to_string(),
        Some(hours) if hours <= 40.0 => formatted.yellow().to_string(),
        Some(_) => formatted.green().to_string(),
        None => formatted.yellow().to_string(),
    }
}

/// Color an optional downtime risk label
pub fn color_risk(risk: Option<u8>) -> String {
    let formatted = format_risk(risk);
    match risk {
        Some(0) => formatted.green().to_string(),
        Some(_) => formatted.red().to_string(),
        None => formatted.yellow().to_string(),
    }
}

/// Format an RFC 3339 timestamp for display
pub fn format_timestamp(ts: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(ts) {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        ts.to_string()
    }
}
