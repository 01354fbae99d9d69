//! PLOG file sources
//!
//! The file-set manager that discovers and sequences PLOG files hands the
//! reader a [`PlogDescriptor`] per physical file. A [`PlogSource`] turns
//! descriptors into byte readers and resolves the load files a parent
//! PLOG references.

use crate::common::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Identity and flags of one physical PLOG file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlogDescriptor {
    /// Unique id of the file within the replicated stream
    pub unique_id: u64,
    pub path: PathBuf,
    /// File is a load file spliced into a parent PLOG
    #[serde(default)]
    pub is_load_file: bool,
    /// File belongs to a mining run that was forcibly restarted
    #[serde(default)]
    pub forced_restart: bool,
}

impl PlogDescriptor {
    pub fn new(unique_id: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            unique_id,
            path: path.into(),
            is_load_file: false,
            forced_restart: false,
        }
    }

    pub fn load_file(unique_id: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            is_load_file: true,
            ..Self::new(unique_id, path)
        }
    }

    pub fn with_forced_restart(mut self, forced_restart: bool) -> Self {
        self.forced_restart = forced_restart;
        self
    }
}

/// Load file reference carried by an include-file record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadFileRef {
    pub file_id: u64,
    pub name: String,
}

/// Opens PLOG files and resolves load-file references.
pub trait PlogSource {
    type Reader: Read + Seek;

    fn open(&self, descriptor: &PlogDescriptor) -> Result<Self::Reader>;

    /// Descriptor of a load file referenced from `parent`.
    fn resolve_load_file(
        &self,
        parent: &PlogDescriptor,
        reference: &LoadFileRef,
    ) -> Result<PlogDescriptor>;
}

/// Filesystem source; load files live next to their parent PLOG.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsPlogSource;

impl FsPlogSource {
    pub fn new() -> Self {
        Self
    }
}

impl PlogSource for FsPlogSource {
    type Reader = BufReader<File>;

    fn open(&self, descriptor: &PlogDescriptor) -> Result<Self::Reader> {
        debug!("Opening PLOG file {}", descriptor.path.display());
        Ok(BufReader::new(File::open(&descriptor.path)?))
    }

    fn resolve_load_file(
        &self,
        parent: &PlogDescriptor,
        reference: &LoadFileRef,
    ) -> Result<PlogDescriptor> {
        let dir = parent.path.parent().unwrap_or_else(|| Path::new("."));
        Ok(PlogDescriptor::load_file(
            reference.file_id,
            dir.join(&reference.name),
        ))
    }
}
