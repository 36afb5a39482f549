//! Export job files
//!
//! A job file is TOML:
//!
//! ```toml
//! [[sequence]]
//! id = "beauty"
//! pattern = "beauty.%04d.tif"
//! directory = "renders/beauty"
//!
//! [export]
//! output_dir = "comp"
//! pattern = "comp.%04d.tif"
//! compression = "zstd"      # default "deflate"
//! policy = "always"         # default "skip"
//! range = [1001, 1100]
//!
//! [export.attributes]
//! Software = "layerkit"
//!
//! [[export.channel]]
//! name = "R"
//! sequence = "beauty"
//! channel = "R"
//! ```
//!
//! Relative directories are resolved against the directory of the job
//! file. Without an `[export.attributes]` table the attributes of the
//! first referenced sequence are inherited.

use log::{info, warn};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::codec::ImageCodec;
use crate::discovery;
use crate::model::{
    AttributeSet, ChannelFormat, ChannelSourceRef, CompressionPolicy, ExportSpec, FrameRangePolicy,
    OutputChannel, SequencePattern, SequenceSet, SequenceSpec,
};

/// Errors raised while loading a job file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read job file {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("Invalid job file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Duplicate sequence id '{0}'")]
    DuplicateSequence(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SequenceEntry {
    pub id: String,
    /// Display name; the id when absent
    pub name: Option<String>,
    pub pattern: String,
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelEntry {
    pub name: String,
    pub sequence: String,
    pub channel: String,
    #[serde(default)]
    pub subimage: usize,
    pub format: Option<ChannelFormat>,
}

fn default_compression() -> String {
    "deflate".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportSection {
    pub output_dir: PathBuf,
    pub pattern: String,
    #[serde(default = "default_compression")]
    pub compression: String,
    #[serde(default)]
    pub policy: CompressionPolicy,
    #[serde(default)]
    pub frame_policy: FrameRangePolicy,
    pub range: Option<[u32; 2]>,
    pub attributes: Option<BTreeMap<String, String>>,
    #[serde(default, rename = "channel")]
    pub channels: Vec<ChannelEntry>,
}

/// Parsed contents of a job file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobFile {
    #[serde(default, rename = "sequence")]
    pub sequences: Vec<SequenceEntry>,
    pub export: ExportSection,
    /// Directory relative paths are resolved against
    #[serde(skip)]
    base_dir: PathBuf,
}

/// A job ready to hand to the export manager
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub spec: ExportSpec,
    pub sequences: SequenceSet,
}

impl FromStr for JobFile {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(content)?)
    }
}

impl JobFile {
    /// Reads and parses a job file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let mut job: JobFile = content.parse()?;
        job.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(job)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Discovers and probes the sequences and builds the export spec
    ///
    /// A sequence that cannot be probed is kept unprobed; validation
    /// reports it when the job runs.
    pub fn build(&self, codec: &dyn ImageCodec) -> ConfigResult<ExportJob> {
        let mut sequences = SequenceSet::new();
        for entry in &self.sequences {
            if sequences.contains(&entry.id) {
                return Err(ConfigError::DuplicateSequence(entry.id.clone()));
            }

            let name = entry.name.as_deref().unwrap_or(&entry.id);
            let pattern = SequencePattern::new(entry.pattern.as_str());
            let directory = self.resolve(&entry.directory);
            let sequence = match SequenceSpec::probe_from_disk(&entry.id, name, pattern.clone(), &directory, codec) {
                Ok(sequence) => sequence,
                Err(e) => {
                    warn!("Sequence '{}' could not be probed: {}", entry.id, e);
                    let frames = discovery::discover_frames(&pattern, &directory);
                    SequenceSpec::new(entry.id.as_str(), name, pattern, directory, frames)
                }
            };
            sequences.insert(sequence);
        }

        let export = &self.export;
        let mut spec = ExportSpec::new(self.resolve(&export.output_dir), SequencePattern::new(export.pattern.as_str()));
        spec.compression = export.compression.clone();
        spec.compression_policy = export.policy;
        spec.frame_policy = export.frame_policy;
        spec.frame_range = export.range.map(|[start, end]| (start, end));

        for entry in &export.channels {
            let mut channel = OutputChannel::new(
                entry.name.as_str(), ChannelSourceRef::new(entry.sequence.as_str(), entry.channel.as_str(), entry.subimage));
            if let Some(format) = entry.format {
                channel = channel.with_format(format);
            }
            spec = spec.with_channel(channel);
        }

        spec.attributes = match &export.attributes {
            Some(table) => table.iter().collect(),
            None => Self::inherited_attributes(&spec, &sequences),
        };

        info!("Job loaded: {} sequences, {} output channels", sequences.len(), spec.channels.len());
        Ok(ExportJob { spec, sequences })
    }

    fn inherited_attributes(spec: &ExportSpec, sequences: &SequenceSet) -> AttributeSet {
        spec.channels
            .first()
            .and_then(|c| sequences.get(&c.source.sequence_id))
            .and_then(|s| s.probe())
            .map(|p| p.attributes.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    use crate::codec::{ChannelPlane, CodecResult, OutputImage};
    use crate::model::{ChannelSpec, FileProbe, SubImageProbe};

    struct ProbeOnly;

    impl ImageCodec for ProbeOnly {
        fn probe(&self, path: &Path) -> CodecResult<FileProbe> {
            Ok(FileProbe {
                path: path.to_path_buf(),
                subimages: vec![SubImageProbe {
                    width: 2,
                    height: 2,
                    channels: vec![ChannelSpec { name: "Y".to_string(), format: ChannelFormat::Uint8 }],
                }],
                attributes: [("Artist", "render farm")].into_iter().collect(),
                compression: "none".to_string(),
            })
        }

        fn read_channel(&self, _: &Path, _: usize, _: &str) -> CodecResult<ChannelPlane> {
            unreachable!()
        }

        fn write_image(&self, _: &Path, _: &OutputImage) -> CodecResult<()> {
            unreachable!()
        }

        fn copy_image(&self, _: &Path, _: &Path) -> CodecResult<()> {
            unreachable!()
        }

        fn supports_compression(&self, _: &str) -> bool {
            true
        }
    }

    const JOB: &str = r#"
        [[sequence]]
        id = "mask"
        pattern = "mask.%04d.tif"
        directory = "plates"

        [export]
        output_dir = "out"
        pattern = "matte.####.tif"
        range = [2, 3]

        [[export.channel]]
        name = "A"
        sequence = "mask"
        channel = "Y"
        format = "uint16"
    "#;

    #[test]
    fn test_defaults() {
        let job: JobFile = JOB.parse().unwrap();
        assert_eq!(job.export.compression, "deflate");
        assert_eq!(job.export.policy, CompressionPolicy::Skip);
        assert_eq!(job.export.frame_policy, FrameRangePolicy::StopAtShortest);
        assert_eq!(job.export.channels[0].subimage, 0);
        assert_eq!(job.sequences[0].name, None);
    }

    #[test]
    fn test_rejects_unknown_keys_and_values() {
        assert!(matches!("[export]\noutput_dir = 'a'\npattern = 'b'\nspeed = 3".parse::<JobFile>(),
                         Err(ConfigError::Parse(_))));
        assert!("[export]\noutput_dir = 'a'\npattern = 'b'\npolicy = 'sometimes'".parse::<JobFile>().is_err());
        assert!("[[sequence]]\nid = 'a'".parse::<JobFile>().is_err());
    }

    #[test]
    fn test_build_resolves_and_inherits() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("plates")).unwrap();
        for frame in 1..=4 {
            File::create(dir.path().join(format!("plates/mask.{:04}.tif", frame))).unwrap();
        }
        let job_path = dir.path().join("job.toml");
        fs::write(&job_path, JOB).unwrap();

        let job = JobFile::load(&job_path).unwrap().build(&ProbeOnly).unwrap();

        let mask = job.sequences.get("mask").unwrap();
        assert_eq!(mask.name, "mask");
        assert_eq!(mask.frames(), &[1, 2, 3, 4]);
        assert!(mask.is_probed());

        assert_eq!(job.spec.output_dir, dir.path().join("out"));
        assert_eq!(job.spec.frame_range, Some((2, 3)));
        assert_eq!(job.spec.channels[0].format_override, Some(ChannelFormat::Uint16));
        assert_eq!(job.spec.attributes.get("Artist"), Some("render farm"));
        assert_eq!(job.spec.output_path(2), dir.path().join("out/matte.0002.tif"));
    }

    #[test]
    fn test_unprobeable_sequence_is_kept() {
        let job: JobFile = JOB.parse().unwrap();
        let built = job.build(&ProbeOnly).unwrap();
        let mask = built.sequences.get("mask").unwrap();
        assert!(!mask.is_probed());
        assert_eq!(mask.frame_count(), 0);
        assert!(built.spec.attributes.is_empty());
    }

    #[test]
    fn test_duplicate_sequence_ids() {
        let content = format!("{}\n{}", "[[sequence]]\nid = 'a'\npattern = 'a.%04d.tif'\ndirectory = '.'\n\
                               [[sequence]]\nid = 'a'\npattern = 'b.%04d.tif'\ndirectory = '.'",
                              "[export]\noutput_dir = 'o'\npattern = 'o.%04d.tif'");
        let job: JobFile = content.parse().unwrap();
        assert!(matches!(job.build(&ProbeOnly), Err(ConfigError::DuplicateSequence(id)) if id == "a"));
    }
}
