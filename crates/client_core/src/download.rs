use std::{
    io,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use shared::domain::{DECK_FILE_EXTENSION, DEFAULT_DECK_NAME};
use tokio::{
    fs::{File, OpenOptions},
    io::AsyncWriteExt,
};
use tracing::info;

use crate::transport::DeckArtifact;

/// Receives a packaged deck and persists it somewhere the user can reach.
///
/// The artifact is passed by value; it is dropped as soon as `save`
/// returns, whether or not the save worked.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn save(&self, file_name: &str, artifact: DeckArtifact) -> Result<PathBuf>;
}

/// Writes decks into a directory, never overwriting an existing file.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ArtifactSink for DirectorySink {
    async fn save(&self, file_name: &str, artifact: DeckArtifact) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create output directory '{}'", self.dir.display()))?;
        let (mut file, path) = create_unique(&self.dir, file_name).await?;
        file.write_all(&artifact.bytes)
            .await
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        file.flush()
            .await
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        info!(path = %path.display(), size_bytes = artifact.len(), "deck saved");
        Ok(path)
    }
}

/// Creates `name.apkg`, or the first free `name (1).apkg`, `name (2).apkg`, ...
///
/// Files are opened with `create_new`, so a name taken between two saves is
/// skipped rather than overwritten.
async fn create_unique(dir: &Path, file_name: &str) -> Result<(File, PathBuf)> {
    let (stem, extension) = match file_name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => (stem, Some(extension)),
        _ => (file_name, None),
    };
    for n in 0u32.. {
        let candidate = match (n, extension) {
            (0, _) => dir.join(file_name),
            (n, Some(extension)) => dir.join(format!("{stem} ({n}).{extension}")),
            (n, None) => dir.join(format!("{stem} ({n})")),
        };
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(file) => return Ok((file, candidate)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to create '{}'", candidate.display()));
            }
        }
    }
    anyhow::bail!("no free file name for '{file_name}' in '{}'", dir.display())
}

/// File name a deck is saved under: `<deck name>.apkg`.
///
/// The deck name itself is sent to the packaging service untouched; only
/// the local file name is cleaned of characters file systems reject.
pub fn deck_file_name(deck_name: &str) -> String {
    let cleaned: String = deck_name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned
        .trim_start()
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace());
    if cleaned.is_empty() {
        return format!("{DEFAULT_DECK_NAME}.{DECK_FILE_EXTENSION}");
    }
    if is_reserved_device_name(cleaned) {
        return format!("_{cleaned}.{DECK_FILE_EXTENSION}");
    }
    format!("{cleaned}.{DECK_FILE_EXTENSION}")
}

/// Windows refuses `CON`, `NUL`, `COM1` and friends as a file stem, with
/// or without an extension.
fn is_reserved_device_name(stem: &str) -> bool {
    let base = stem.split('.').next().unwrap_or_default().trim_end();
    let upper = base.to_ascii_uppercase();
    match upper.as_str() {
        "CON" | "PRN" | "AUX" | "NUL" => true,
        _ => ["COM", "LPT"].iter().any(|prefix| {
            upper.strip_prefix(prefix).is_some_and(|digit| {
                digit.len() == 1 && digit.chars().all(|c| ('1'..='9').contains(&c))
            })
        }),
    }
}

#[cfg(test)]
#[path = "tests/download_tests.rs"]
mod tests;
