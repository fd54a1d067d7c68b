use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::{info, warn};
use queen_formats::ResourceArchive;
use walkdir::WalkDir;

use crate::error::EngineError;

/// Named game resources, looked up case-insensitively.
pub trait ResourceSource {
    fn read(&self, name: &str) -> Result<Vec<u8>>;
    fn contains(&self, name: &str) -> bool;
}

/// A data directory: `.qra` archives plus loose files found anywhere below
/// it. Loose files shadow archive entries of the same name.
#[derive(Debug)]
pub struct ResourceCollection {
    root: PathBuf,
    archives: Vec<ResourceArchive>,
    loose: BTreeMap<String, PathBuf>,
}

fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("qra"))
        .unwrap_or(false)
}

impl ResourceCollection {
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            bail!("{} is not a directory", dir.display());
        }

        let mut archive_paths = Vec::new();
        let mut loose = BTreeMap::new();
        for entry in WalkDir::new(dir).into_iter().filter_map(|res| res.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            if is_archive(&path) {
                archive_paths.push(path);
            } else if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                loose.insert(name.to_ascii_uppercase(), path.clone());
            }
        }
        archive_paths.sort();

        let mut archives = Vec::new();
        for path in archive_paths {
            match ResourceArchive::open(&path) {
                Ok(archive) => archives.push(archive),
                Err(err) => warn!("failed to open {}: {err:?}", path.display()),
            }
        }
        info!(
            "resources in {}: {} archives, {} loose files",
            dir.display(),
            archives.len(),
            loose.len()
        );

        Ok(Self {
            root: dir.to_path_buf(),
            archives,
            loose,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn archive_count(&self) -> usize {
        self.archives.len()
    }
}

impl ResourceSource for ResourceCollection {
    fn read(&self, name: &str) -> Result<Vec<u8>> {
        if let Some(path) = self.loose.get(&name.to_ascii_uppercase()) {
            return fs::read(path).with_context(|| format!("reading {}", path.display()));
        }
        for archive in &self.archives {
            if let Some(entry) = archive.find_entry(name) {
                return Ok(archive.read_entry_bytes(entry).to_vec());
            }
        }
        Err(EngineError::MissingResource(name.to_string()).into())
    }

    fn contains(&self, name: &str) -> bool {
        self.loose.contains_key(&name.to_ascii_uppercase())
            || self
                .archives
                .iter()
                .any(|archive| archive.find_entry(name).is_some())
    }
}

/// In-memory resources for tests and tools.
#[derive(Debug, Clone, Default)]
pub struct MemoryResources {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, data: Vec<u8>) -> &mut Self {
        self.files.insert(name.to_ascii_uppercase(), data);
        self
    }
}

impl ResourceSource for MemoryResources {
    fn read(&self, name: &str) -> Result<Vec<u8>> {
        self.files
            .get(&name.to_ascii_uppercase())
            .cloned()
            .ok_or_else(|| EngineError::MissingResource(name.to_string()).into())
    }

    fn contains(&self, name: &str) -> bool {
        self.files.contains_key(&name.to_ascii_uppercase())
    }
}
