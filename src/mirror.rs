// Mirror module: walks a local directory tree and recreates its
// structure in Synapse. A cache of remote folder handles keyed by
// remote path string resolves parents; the pre-order walk guarantees a
// parent is cached before any of its children are created.

use crate::api::{Credentials, FolderHandle, RemoteStore};
use anyhow::{anyhow, Context, Result};
use log::debug;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Identifier assigned to folders created during a dry run so later
/// lookups still find a usable parent.
const DRY_RUN_ID: &str = "syn0";

/// Mirrors a local directory into a Synapse project, optionally beneath
/// a remote folder path, recreating folders and uploading files while
/// preserving the relative structure.
pub struct Uploader<S: RemoteStore> {
    store: S,
    project_id: String,
    local_path: PathBuf,
    remote_path: Option<String>,
    dry_run: bool,
    folders: HashMap<String, FolderHandle>,
    // Progress lines go here; stdout in production, a capture buffer in
    // tests.
    out: Box<dyn Write>,
}

impl<S: RemoteStore> Uploader<S> {
    /// An empty or whitespace-only remote path means "no prefix"; stray
    /// separators at either end are dropped.
    pub fn new(
        store: S,
        project_id: impl Into<String>,
        local_path: impl Into<PathBuf>,
        remote_path: Option<&str>,
        dry_run: bool,
    ) -> Self {
        let remote_path = remote_path
            .map(|p| p.trim().trim_matches('/').to_string())
            .filter(|p| !p.is_empty());

        Uploader {
            store,
            project_id: project_id.into(),
            local_path: local_path.into(),
            remote_path,
            dry_run,
            folders: HashMap::new(),
            out: Box::new(io::stdout()),
        }
    }

    /// Runs the full mirror: log in, resolve the project root, pre-create
    /// the remote prefix, then walk the local tree creating folders and
    /// uploading files. Any failure aborts the run, leaving whatever was
    /// already created in place.
    pub fn start(&mut self) -> Result<()> {
        if self.dry_run {
            writeln!(self.out, "~~ Dry Run ~~")?;
        }
        writeln!(self.out, "Uploading to Project: {}", self.project_id)?;
        writeln!(self.out, "Uploading Directory: {}", self.local_path.display())?;
        if let Some(remote) = &self.remote_path {
            writeln!(self.out, "Uploading To: {}", remote)?;
        }

        writeln!(self.out, "Logging into Synapse...")?;
        let credentials = Credentials::from_env()?;
        self.store.login(&credentials)?;

        let project_id = self.project_id.clone();
        let project = self.store.get_project(&project_id)?;
        self.folders.insert(project_id, project);

        // Pre-create the remote prefix one segment at a time so each
        // folder can act as the parent of the next. Empty segments from
        // doubled separators are skipped.
        if let Some(remote) = self.remote_path.clone() {
            let mut full_path = String::new();
            for segment in remote.split('/').filter(|s| !s.is_empty()) {
                if full_path.is_empty() {
                    full_path = segment.to_string();
                } else {
                    full_path = format!("{}/{}", full_path, segment);
                }
                self.create_directory(Path::new(&full_path), true)?;
            }
        }

        // Pre-order walk with sorted entries: a directory is always
        // visited before anything inside it. The local root itself is
        // never created remotely.
        let root = self.local_path.clone();
        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = entry.context("Walking local directory")?;
            if entry.file_type().is_dir() {
                if entry.path() != root {
                    self.create_directory(entry.path(), false)?;
                }
            } else {
                self.upload_file(entry.path())?;
            }
        }

        if self.dry_run {
            writeln!(self.out, "Dry Run Completed Successfully.")?;
        } else {
            writeln!(self.out, "Upload Completed Successfully.")?;
        }
        Ok(())
    }

    /// Maps a local path (or, in virtual mode, a prefix path that has no
    /// local counterpart) to its remote path string: the project id,
    /// then the remote prefix when present, then the local path stripped
    /// of the local root. Resolution is pure, so resolving the same path
    /// twice yields the same string.
    fn resolve_remote_path(&self, path: &Path, is_virtual: bool) -> Result<String> {
        if is_virtual {
            return Ok(format!("{}/{}", self.project_id, path.display()));
        }

        let relative = path.strip_prefix(&self.local_path).with_context(|| {
            format!(
                "{} is outside the upload root {}",
                path.display(),
                self.local_path.display()
            )
        })?;

        let mut parts = vec![self.project_id.clone()];
        if let Some(remote) = &self.remote_path {
            parts.push(remote.clone());
        }
        parts.extend(
            relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned()),
        );
        Ok(parts.join("/"))
    }

    /// Creates (or simulates) the remote folder for `path` and caches its
    /// handle under the full remote path.
    fn create_directory(&mut self, path: &Path, is_virtual: bool) -> Result<()> {
        writeln!(self.out, "Processing Folder: {}", path.display())?;

        let full_remote_path = self.resolve_remote_path(path, is_virtual)?;
        writeln!(self.out, "  -> {}", full_remote_path)?;
        debug!("resolved folder {} -> {}", path.display(), full_remote_path);

        let (parent_path, folder_name) = split_remote_path(&full_remote_path);
        let parent = self.lookup_folder(parent_path)?.clone();

        let folder = if self.dry_run {
            // A fake id keeps this folder usable as a parent without a
            // network call.
            FolderHandle::new(DRY_RUN_ID)
        } else {
            self.store.create_folder(folder_name, &parent)?
        };

        self.folders.insert(full_remote_path, folder);
        Ok(())
    }

    /// Uploads the file under its resolved remote parent; skipped (but
    /// still logged) in dry-run mode.
    fn upload_file(&mut self, path: &Path) -> Result<()> {
        writeln!(self.out, "Processing File: {}", path.display())?;

        let full_remote_path = self.resolve_remote_path(path, false)?;
        writeln!(self.out, "  -> {}", full_remote_path)?;
        debug!("resolved file {} -> {}", path.display(), full_remote_path);

        let (parent_path, _) = split_remote_path(&full_remote_path);
        let parent = self.lookup_folder(parent_path)?.clone();

        if !self.dry_run {
            self.store.store_file(path, &parent)?;
        }
        Ok(())
    }

    /// Walk order caches every parent before its children need it, so a
    /// miss means the traversal order is broken: fail loudly rather than
    /// create an orphan.
    fn lookup_folder(&self, remote_path: &str) -> Result<&FolderHandle> {
        self.folders
            .get(remote_path)
            .ok_or_else(|| anyhow!("No remote folder cached for '{}'", remote_path))
    }
}

/// Splits a normalized remote path into (parent path, entry name). The
/// project id itself is seeded directly into the cache and never passes
/// through here.
fn split_remote_path(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((parent, name)) => (parent, name),
        None => ("", path),
    }
}
