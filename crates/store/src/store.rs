//! Filesystem-backed play store.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use play_engine_core::play::Play;

use crate::corruption::detect_corruption;
use crate::error::StoreError;
use crate::folders::PlayFolder;

/// Handle to the record store root. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PlayStore {
    root: PathBuf,
}

impl PlayStore {
    /// Opens (and lazily creates) the store at `root` with all lifecycle
    /// folders present.
    ///
    /// # Errors
    ///
    /// Returns an error when the root or a lifecycle folder cannot be
    /// created — the one failure treated as fatal at startup.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        for folder in PlayFolder::ALL {
            fs::create_dir_all(root.join(folder.dir_name()))?;
        }
        info!(root = %root.display(), "Play store opened");
        Ok(Self { root })
    }

    /// Store root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a play document in a folder.
    #[must_use]
    pub fn path_for(&self, folder: PlayFolder, name: &str) -> PathBuf {
        self.root
            .join(folder.dir_name())
            .join(Self::file_name(name))
    }

    fn file_name(name: &str) -> String {
        if name.ends_with(".json") {
            name.to_string()
        } else {
            format!("{name}.json")
        }
    }

    /// Lists play names (filename stems) in a folder, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder cannot be read.
    pub fn list(&self, folder: PlayFolder) -> Result<Vec<String>, StoreError> {
        let dir = self.root.join(folder.dir_name());
        let mut names = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Loads a play, running the structural integrity check first.
    ///
    /// # Errors
    ///
    /// `StoreError::Corrupt` when the document fails a heuristic — the
    /// caller routes it to repair before retrying. `NotFound` when absent.
    pub fn load(&self, folder: PlayFolder, name: &str) -> Result<Play, StoreError> {
        let path = self.path_for(folder, name);
        if !path.exists() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        let content = fs::read_to_string(&path)?;
        if let Some(kind) = detect_corruption(&content) {
            return Err(StoreError::Corrupt { path, kind });
        }
        match serde_json::from_str(&content) {
            Ok(play) => Ok(play),
            Err(_) => Err(StoreError::Corrupt {
                path,
                kind: crate::corruption::CorruptionKind::ParseFailure,
            }),
        }
    }

    /// Persists a play into a folder atomically: serialize to a `.tmp`
    /// sibling, then rename over the destination. A concurrent reader sees
    /// either the old document or the new one, never a partial write.
    ///
    /// # Errors
    ///
    /// Returns an error on serialization or IO failure.
    pub fn save(&self, play: &Play, folder: PlayFolder) -> Result<(), StoreError> {
        let path = self.path_for(folder, &play.play_name);
        let content = serde_json::to_string_pretty(play)?;
        self.write_atomic(&path, &content)?;
        debug!(play = %play.play_name, folder = %folder, "Play saved");
        Ok(())
    }

    /// Raw atomic write used by the repair pass.
    ///
    /// # Errors
    ///
    /// Returns an error on IO failure.
    pub fn write_atomic(&self, path: &Path, content: &str) -> Result<(), StoreError> {
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Moves a play document between lifecycle folders.
    ///
    /// # Errors
    ///
    /// `NotFound` when the source document is absent; IO errors otherwise.
    pub fn move_play(
        &self,
        name: &str,
        from: PlayFolder,
        to: PlayFolder,
    ) -> Result<(), StoreError> {
        let src = self.path_for(from, name);
        if !src.exists() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        let dst = self.path_for(to, name);
        fs::rename(&src, &dst)?;
        info!(play = name, from = %from, to = %to, "Play moved");
        Ok(())
    }

    /// Deletes a play document from a folder.
    ///
    /// # Errors
    ///
    /// `NotFound` when absent; IO errors otherwise.
    pub fn remove(&self, folder: PlayFolder, name: &str) -> Result<(), StoreError> {
        let path = self.path_for(folder, name);
        if !path.exists() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        fs::remove_file(&path)?;
        info!(play = name, folder = %folder, "Play removed");
        Ok(())
    }

    /// Finds which folder holds a play, if any.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<PlayFolder> {
        PlayFolder::ALL
            .into_iter()
            .find(|folder| self.path_for(*folder, name).exists())
    }
}
