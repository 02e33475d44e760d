//! Note command handlers

use anyhow::{bail, Context, Result};

use notedoc_core::{NoteDraft, NoteRepository, ObjectId};

use crate::output::Output;

/// List notes, optionally one page at a time
pub async fn list(
    repo: &NoteRepository,
    page: Option<u64>,
    limit: Option<u64>,
    output: &Output,
) -> Result<()> {
    let notes = repo
        .get_all(page, limit)
        .await
        .context("Failed to list notes")?;
    output.print_notes(&notes);
    Ok(())
}

/// Show one note
pub async fn show(repo: &NoteRepository, id: String, output: &Output) -> Result<()> {
    let id = parse_note_id(&id, repo).await?;
    let note = repo.get_by_id(&id).await?;
    output.print_note(&note);
    Ok(())
}

/// Create a new note
pub async fn create(
    repo: &NoteRepository,
    title: String,
    description: Option<String>,
    output: &Output,
) -> Result<()> {
    if title.trim().is_empty() {
        bail!("Note title cannot be empty");
    }

    let draft = NoteDraft::new(title, description.unwrap_or_default());
    let id = repo.create(draft).await.context("Failed to create note")?;

    output.id(&id);
    Ok(())
}

/// Replace a note's title and description
pub async fn update(
    repo: &NoteRepository,
    id: String,
    title: String,
    description: String,
    output: &Output,
) -> Result<()> {
    let id = parse_note_id(&id, repo).await?;
    let result = repo
        .update(&id, NoteDraft::new(title, description))
        .await
        .context("Failed to update note")?;

    if !result.target_found() {
        output.warning(&format!("No note with id {}", id));
    } else if result.modified_count == 0 {
        output.success(&format!("Note {} already up to date", id));
    } else {
        output.success(&format!("Updated note {}", id));
    }
    Ok(())
}

/// Delete a note
pub async fn delete(repo: &NoteRepository, id: String, output: &Output) -> Result<()> {
    let id = parse_note_id(&id, repo).await?;
    let result = repo.delete(&id).await.context("Failed to delete note")?;

    if result.deleted_count == 0 {
        output.warning(&format!("No note with id {}", id));
    } else {
        output.success(&format!("Deleted note {}", id));
    }
    Ok(())
}

/// Parse a note ID (supports full hex id or unique prefix)
async fn parse_note_id(id: &str, repo: &NoteRepository) -> Result<ObjectId> {
    if let Ok(object_id) = ObjectId::parse_str(id) {
        return Ok(object_id);
    }

    let prefix = id.trim().to_ascii_lowercase();
    if prefix.is_empty() {
        bail!("Note id cannot be empty");
    }

    let notes = repo.get_all(None, None).await?.notes;
    let matches: Vec<_> = notes
        .iter()
        .filter(|n| n.id.to_hex().starts_with(&prefix))
        .collect();

    match matches.len() {
        0 => bail!("No note found matching: {}", id),
        1 => Ok(matches[0].id),
        _ => {
            eprintln!("Multiple notes match '{}':", id);
            for note in &matches {
                eprintln!("  {} - {}", note.id, note.title);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}
