//! Image sequences and the set of sequences a job draws from

use log::{debug, info};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::pattern::SequencePattern;
use super::probe::FileProbe;
use crate::codec::{CodecError, CodecResult, ImageCodec};
use crate::discovery;

/// A numbered image sequence on disk
#[derive(Debug, Clone)]
pub struct SequenceSpec {
    pub id: String,
    pub name: String,
    pub pattern: SequencePattern,
    pub directory: PathBuf,
    /// Available frame numbers, ascending and unique
    frames: Vec<u32>,
    /// Metadata of a representative frame
    probe: Option<FileProbe>,
}

impl SequenceSpec {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        pattern: SequencePattern,
        directory: impl Into<PathBuf>,
        frames: impl IntoIterator<Item = u32>,
    ) -> Self {
        let mut frames: Vec<u32> = frames.into_iter().collect();
        frames.sort_unstable();
        frames.dedup();
        SequenceSpec {
            id: id.into(),
            name: name.into(),
            pattern,
            directory: directory.into(),
            frames,
            probe: None,
        }
    }

    /// Attaches probe metadata
    pub fn with_probe(mut self, probe: FileProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Discovers the frames of a sequence on disk and probes the first one
    pub fn probe_from_disk(
        id: &str,
        name: &str,
        pattern: SequencePattern,
        directory: &Path,
        codec: &dyn ImageCodec,
    ) -> CodecResult<Self> {
        let frames = discovery::discover_frames(&pattern, directory);
        info!("Sequence '{}': {} frames found for {} in {}",
              id, frames.len(), pattern, directory.display());

        let mut sequence = SequenceSpec::new(id, name, pattern, directory, frames);
        sequence.reprobe(codec)?;
        Ok(sequence)
    }

    /// Refreshes the probe metadata from the first available frame
    pub fn reprobe(&mut self, codec: &dyn ImageCodec) -> CodecResult<()> {
        let first = self.first_frame().ok_or_else(|| {
            CodecError::Other(format!("Sequence '{}' has no frames to probe", self.id))
        })?;
        let path = self.frame_path(first);
        debug!("Probing sequence '{}' from {}", self.id, path.display());
        self.probe = Some(codec.probe(&path)?);
        Ok(())
    }

    pub fn frames(&self) -> &[u32] {
        &self.frames
    }

    pub fn first_frame(&self) -> Option<u32> {
        self.frames.first().copied()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn probe(&self) -> Option<&FileProbe> {
        self.probe.as_ref()
    }

    pub fn is_probed(&self) -> bool {
        self.probe.is_some()
    }

    /// Path of the file holding `frame`
    pub fn frame_path(&self, frame: u32) -> PathBuf {
        self.directory.join(self.pattern.format(frame))
    }
}

/// Sequences of a job, keyed by id
#[derive(Debug, Clone, Default)]
pub struct SequenceSet {
    sequences: BTreeMap<String, SequenceSpec>,
}

impl SequenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sequence, replacing one with the same id
    pub fn insert(&mut self, sequence: SequenceSpec) {
        self.sequences.insert(sequence.id.clone(), sequence);
    }

    pub fn get(&self, id: &str) -> Option<&SequenceSpec> {
        self.sequences.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sequences.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SequenceSpec> {
        self.sequences.values()
    }
}

impl FromIterator<SequenceSpec> for SequenceSet {
    fn from_iter<I: IntoIterator<Item = SequenceSpec>>(iter: I) -> Self {
        let mut set = SequenceSet::new();
        for sequence in iter {
            set.insert(sequence);
        }
        set
    }
}
