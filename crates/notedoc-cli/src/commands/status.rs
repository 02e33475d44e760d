//! Status command handler

use anyhow::Result;

use notedoc_core::{Config, Database, NOTES_COLLECTION};

use crate::output::{Output, OutputFormat};

/// Show status information
pub async fn show(db: &Database, config: &Config, output: &Output) -> Result<()> {
    let store = db.store();
    let notes = store.count(NOTES_COLLECTION).await?;
    let size = store.file_size().await;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "store_path": config.store_path(),
                    "store_size": size,
                    "operation_timeout_secs": config.operation_timeout().as_secs(),
                    "counts": {
                        "notes": notes
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", notes);
        }
        OutputFormat::Human => {
            println!("notedoc Status");
            println!("==============");
            println!();
            println!("Storage:");
            println!("  Location: {}", config.store_path().display());
            println!("  Size:     {}", human_size(size));
            println!();
            println!("Contents:");
            println!("  Notes: {}", notes);
        }
    }

    Ok(())
}

fn human_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KB");
        assert_eq!(human_size(3 * 1024 * 1024), "3.0 MB");
    }
}
