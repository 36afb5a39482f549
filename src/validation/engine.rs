//! Built-in validation rules

use log::debug;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::{ValidationIssue, Validator};
use crate::codec::ImageCodec;
use crate::model::{ExportSpec, SequenceSet};

/// Validates export jobs against the probed sequences and the codec
pub struct ValidationEngine {
    codec: Arc<dyn ImageCodec>,
}

impl ValidationEngine {
    pub fn new(codec: Arc<dyn ImageCodec>) -> Self {
        ValidationEngine { codec }
    }

    fn check_output_channels(spec: &ExportSpec, issues: &mut Vec<ValidationIssue>) {
        if spec.channels.is_empty() {
            issues.push(ValidationIssue::error(
                "NO_OUTPUT_CHANNELS", "At least one output channel must be selected."));
            return;
        }

        let mut seen = BTreeSet::new();
        let duplicates: BTreeSet<&str> = spec
            .channels
            .iter()
            .filter(|c| !seen.insert(c.name.as_str()))
            .map(|c| c.name.as_str())
            .collect();
        if !duplicates.is_empty() {
            let names: Vec<&str> = duplicates.into_iter().collect();
            issues.push(ValidationIssue::error(
                "DUPLICATE_CHANNEL_NAMES",
                format!("Duplicate output channel names: {}", names.join(", "))));
        }
    }

    fn check_sources(spec: &ExportSpec, sequences: &SequenceSet, issues: &mut Vec<ValidationIssue>) {
        let mut resolutions = BTreeSet::new();
        let mut reported = BTreeSet::new();

        for channel in &spec.channels {
            let id = channel.source.sequence_id.as_str();
            let Some(probe) = sequences.get(id).and_then(|s| s.probe()) else {
                if reported.insert(id) {
                    issues.push(ValidationIssue::error(
                        "MISSING_SEQUENCE", format!("Sequence '{}' not found.", id)));
                }
                continue;
            };

            if let Some(main) = probe.main_subimage() {
                resolutions.insert((main.width, main.height));
            }

            // A format override accepts whatever the source provides
            if channel.format_override.is_some() {
                continue;
            }
            let found = probe
                .subimage(channel.source.subimage)
                .and_then(|sub| sub.channel(&channel.source.channel_name))
                .is_some();
            if !found {
                issues.push(ValidationIssue::error(
                    "SOURCE_CHANNEL_NOT_FOUND",
                    format!("Channel '{}' not found in sequence '{}'.", channel.source.channel_name, id)));
            }
        }

        if resolutions.len() > 1 {
            let listed: Vec<String> = resolutions.iter().map(|(w, h)| format!("{}x{}", w, h)).collect();
            issues.push(ValidationIssue::error(
                "INCONSISTENT_RESOLUTION",
                format!("Output channels have different resolutions: {}", listed.join(", "))));
        }
    }

    fn check_output(&self, spec: &ExportSpec, issues: &mut Vec<ValidationIssue>) {
        if spec.output_dir.as_os_str().is_empty() {
            issues.push(ValidationIssue::error("MISSING_OUTPUT_DIR", "Output directory not specified."));
        }

        if !spec.pattern.has_frame_token() {
            issues.push(ValidationIssue::warning(
                "NO_FRAME_TOKEN",
                format!("Filename pattern '{}' has no frame token (%04d or ####). \
                         Every frame will overwrite the same file.", spec.pattern)));
        }

        if !self.codec.supports_compression(&spec.compression) {
            issues.push(ValidationIssue::error(
                "UNSUPPORTED_COMPRESSION",
                format!("Compression '{}' is not supported.", spec.compression)));
        }
    }

    fn check_frames(spec: &ExportSpec, sequences: &SequenceSet, issues: &mut Vec<ValidationIssue>) {
        if let Some((start, end)) = spec.frame_range {
            if start > end {
                issues.push(ValidationIssue::error(
                    "INVALID_FRAME_RANGE",
                    format!("Frame range start {} is after end {}.", start, end)));
            }
        }

        let counts: BTreeMap<&str, usize> = sequences.iter().map(|s| (s.id.as_str(), s.frame_count())).collect();
        let distinct: BTreeSet<usize> = counts.values().copied().collect();
        if distinct.len() > 1 {
            let listed: Vec<String> = counts.iter().map(|(id, n)| format!("{}={}", id, n)).collect();
            issues.push(ValidationIssue::warning(
                "SEQUENCE_LENGTH_MISMATCH",
                format!("Sequences have different frame counts: {}. Frame policy: {}",
                        listed.join(", "), spec.frame_policy)));
        }
    }

    fn check_attributes(spec: &ExportSpec, issues: &mut Vec<ValidationIssue>) {
        for (name, value) in spec.attributes.iter() {
            if name.trim().is_empty() {
                issues.push(ValidationIssue::error("EMPTY_ATTRIBUTE_NAME", "Attribute has empty name."));
            } else if value.is_empty() {
                issues.push(ValidationIssue::warning(
                    "EMPTY_ATTRIBUTE_VALUE", format!("Attribute '{}' has an empty value.", name)));
            }
        }
    }
}

impl Validator for ValidationEngine {
    fn validate(&self, spec: &ExportSpec, sequences: &SequenceSet) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        Self::check_output_channels(spec, &mut issues);
        Self::check_sources(spec, sequences, &mut issues);
        self.check_output(spec, &mut issues);
        Self::check_frames(spec, sequences, &mut issues);
        Self::check_attributes(spec, &mut issues);

        debug!("Validation produced {} issues", issues.len());
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AttributeSet, ChannelFormat, ChannelSourceRef, ChannelSpec, FileProbe, OutputChannel,
        SequencePattern, SequenceSpec, SubImageProbe,
    };
    use crate::tiff::TiffCodec;
    use crate::validation::Severity;

    fn probed(id: &str, width: usize, channels: &[&str], frames: std::ops::RangeInclusive<u32>) -> SequenceSpec {
        let probe = FileProbe {
            path: format!("/plates/{}.0001.tif", id).into(),
            subimages: vec![SubImageProbe {
                width,
                height: 4,
                channels: channels
                    .iter()
                    .map(|n| ChannelSpec { name: n.to_string(), format: ChannelFormat::Uint8 })
                    .collect(),
            }],
            attributes: AttributeSet::new(),
            compression: "deflate".to_string(),
        };
        SequenceSpec::new(id, id, SequencePattern::new(format!("{}.%04d.tif", id)), "/plates", frames)
            .with_probe(probe)
    }

    fn spec_with(channels: Vec<OutputChannel>) -> ExportSpec {
        let mut spec = ExportSpec::new("/out", SequencePattern::new("comp.%04d.tif"));
        spec.channels = channels;
        spec
    }

    fn channel(name: &str, seq: &str, source: &str) -> OutputChannel {
        OutputChannel::new(name, ChannelSourceRef::new(seq, source, 0))
    }

    fn codes(issues: &[ValidationIssue]) -> Vec<&'static str> {
        issues.iter().map(|i| i.code).collect()
    }

    fn engine() -> ValidationEngine {
        ValidationEngine::new(Arc::new(TiffCodec::new()))
    }

    #[test]
    fn test_valid_job_has_no_issues() {
        let sequences: SequenceSet = [probed("beauty", 4, &["R", "G", "B"], 1..=3)].into_iter().collect();
        let spec = spec_with(vec![channel("R", "beauty", "R"), channel("G", "beauty", "G")]);

        assert!(engine().validate(&spec, &sequences).is_empty());
    }

    #[test]
    fn test_no_output_channels() {
        let issues = engine().validate(&spec_with(vec![]), &SequenceSet::new());
        assert_eq!(codes(&issues), vec!["NO_OUTPUT_CHANNELS"]);
        assert_eq!(issues[0].to_string(), "[ERROR] NO_OUTPUT_CHANNELS: At least one output channel must be selected.");
    }

    #[test]
    fn test_channel_and_sequence_errors() {
        let sequences: SequenceSet = [
            probed("beauty", 4, &["R", "G", "B"], 1..=3),
            probed("depth", 8, &["Z"], 1..=3),
        ].into_iter().collect();
        let spec = spec_with(vec![
            channel("R", "beauty", "R"),
            channel("R", "beauty", "X"),
            channel("Z", "depth", "Z"),
            channel("M", "matte", "A"),
        ]);

        let issues = engine().validate(&spec, &sequences);
        let found = codes(&issues);
        assert!(found.contains(&"DUPLICATE_CHANNEL_NAMES"));
        assert!(found.contains(&"SOURCE_CHANNEL_NOT_FOUND"));
        assert!(found.contains(&"MISSING_SEQUENCE"));
        assert!(found.contains(&"INCONSISTENT_RESOLUTION"));
        assert!(issues.iter().all(|i| i.severity == Severity::Error));
    }

    #[test]
    fn test_format_override_skips_channel_lookup() {
        let sequences: SequenceSet = [probed("beauty", 4, &["R"], 1..=3)].into_iter().collect();
        let spec = spec_with(vec![channel("X", "beauty", "missing").with_format(ChannelFormat::Float)]);

        assert!(engine().validate(&spec, &sequences).is_empty());
    }

    #[test]
    fn test_warnings_and_settings() {
        let sequences: SequenceSet = [
            probed("beauty", 4, &["R"], 1..=3),
            probed("alpha", 4, &["A"], 1..=5),
        ].into_iter().collect();
        let mut spec = spec_with(vec![channel("R", "beauty", "R")]);
        spec.pattern = SequencePattern::new("still.tif");
        spec.compression = "piz".to_string();
        spec.frame_range = Some((10, 2));
        spec.output_dir = "".into();
        spec.attributes.insert("Artist", "");
        spec.attributes.insert(" ", "x");

        let issues = engine().validate(&spec, &sequences);
        let errors: Vec<_> = issues.iter().filter(|i| i.is_error()).map(|i| i.code).collect();
        let warnings: Vec<_> = issues.iter().filter(|i| !i.is_error()).map(|i| i.code).collect();

        assert_eq!(errors, vec!["MISSING_OUTPUT_DIR", "UNSUPPORTED_COMPRESSION", "INVALID_FRAME_RANGE", "EMPTY_ATTRIBUTE_NAME"]);
        assert_eq!(warnings, vec!["NO_FRAME_TOKEN", "SEQUENCE_LENGTH_MISMATCH", "EMPTY_ATTRIBUTE_VALUE"]);
        assert!(issues.iter().any(|i| i.message.contains("stop_at_shortest")));
    }
}
