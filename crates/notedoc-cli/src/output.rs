//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use notedoc_core::{Note, NotePage};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a single note
    pub fn print_note(&self, note: &Note) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:          {}", note.id);
                println!("Title:       {}", note.title);
                println!("Created:     {}", note.id.timestamp().format("%Y-%m-%d %H:%M"));
                if !note.description.is_empty() {
                    println!();
                    println!("{}", note.description);
                }
            }
            OutputFormat::Json => print_json(note),
            OutputFormat::Quiet => {
                println!("{}", note.id);
            }
        }
    }

    /// Print a page of notes
    pub fn print_notes(&self, page: &NotePage) {
        match self.format {
            OutputFormat::Human => {
                if page.notes.is_empty() {
                    println!("No notes found.");
                } else {
                    for note in &page.notes {
                        println!(
                            "{} | {} | {}",
                            note.id,
                            truncate(&note.title, 35),
                            truncate_line(&note.description, 40)
                        );
                    }
                    println!("\n{} note(s)", page.notes.len());
                }
                if !page.skipped.is_empty() {
                    eprintln!(
                        "⚠ {} stored document(s) could not be read as notes",
                        page.skipped.len()
                    );
                }
            }
            OutputFormat::Json => print_json(page),
            OutputFormat::Quiet => {
                for note in &page.notes {
                    println!("{}", note.id);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a message for an operation that found nothing to act on
    pub fn warning(&self, message: &str) {
        match self.format {
            OutputFormat::Human => eprintln!("⚠ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "not_found", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a bare id (create prints the new id in every mode)
    pub fn id(&self, id: &impl std::fmt::Display) {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::json!({"id": id.to_string()})),
            _ => println!("{}", id),
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to format JSON output: {}", e),
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}
