// Saved compositions and sequence exports live in a dot-directory next to
// where the app was started.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::music::Sequence;

const CODETONE_DIR: &str = ".codetone";
const COMPOSITIONS_FILE: &str = "compositions.json";
const SEQUENCE_FILE: &str = "sequence.json";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Composition {
    pub id: u64,
    pub title: String,
    pub code: String,
    pub date: String,
    pub created_at: String,
}

/// What the caller gets back after a save.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveReceipt {
    pub id: u64,
    pub created_at: String,
}

// <base>/.codetone/compositions.json
fn compositions_path(base: &Path) -> PathBuf {
    base.join(CODETONE_DIR).join(COMPOSITIONS_FILE)
}

fn sequence_path(base: &Path) -> PathBuf {
    base.join(CODETONE_DIR).join(SEQUENCE_FILE)
}

pub fn load_compositions(base: &Path) -> Vec<Composition> {
    let path = compositions_path(base);
    let Some(data) = std::fs::read_to_string(&path).ok() else {
        return Vec::new();
    };
    serde_json::from_str(&data).unwrap_or_default()
}

/// Append a composition and write the whole list back. The id and creation
/// stamp are assigned here, not by the caller.
pub fn save_composition(base: &Path, title: &str, code: &str, date: &str) -> anyhow::Result<SaveReceipt> {
    let path = compositions_path(base);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock before the epoch")?;
    let id = now.as_nanos() as u64;
    let created_at = format!("{}", now.as_secs());

    let mut compositions = load_compositions(base);
    compositions.push(Composition {
        id,
        title: title.to_string(),
        code: code.to_string(),
        date: date.to_string(),
        created_at: created_at.clone(),
    });

    let json = serde_json::to_string_pretty(&compositions)?;
    std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;

    Ok(SaveReceipt { id, created_at })
}

/// Dump the generated sequence as JSON for use outside the app.
pub fn export_sequence(base: &Path, sequence: &Sequence) -> anyhow::Result<PathBuf> {
    let path = sequence_path(base);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(sequence)?;
    std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}
