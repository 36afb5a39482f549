//! Direct-copy eligibility

use std::collections::BTreeSet;

use crate::model::{CompressionPolicy, ExportSpec, SequenceSet};

/// Result of the eligibility test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyDecision {
    /// Frames may be copied container-to-container
    pub can_skip_recompression: bool,
    pub reason: String,
}

impl StrategyDecision {
    fn copy() -> Self {
        StrategyDecision {
            can_skip_recompression: true,
            reason: "Can skip recompression: identical copy possible".to_string(),
        }
    }

    fn recompress(reason: impl Into<String>) -> Self {
        StrategyDecision { can_skip_recompression: false, reason: reason.into() }
    }
}

/// Decides whether a job can skip decoding and re-encoding
///
/// The checks run in a fixed order and stop at the first failure, whose
/// reason is reported. Attribute values are not compared, only names and
/// counts.
pub fn select_strategy(spec: &ExportSpec, sequences: &SequenceSet) -> StrategyDecision {
    if spec.compression_policy == CompressionPolicy::Always {
        return StrategyDecision::recompress("Compression policy: always recompress");
    }

    let source_ids = spec.source_sequence_ids();
    if source_ids.len() != 1 {
        return StrategyDecision::recompress(format!("Multiple source sequences ({})", source_ids.len()));
    }
    let Some(id) = source_ids.into_iter().next() else {
        return StrategyDecision::recompress("Multiple source sequences (0)");
    };

    let Some(probe) = sequences.get(id).and_then(|s| s.probe()) else {
        return StrategyDecision::recompress(format!("Source sequence '{}' not found or not probed", id));
    };
    let Some(main) = probe.main_subimage() else {
        return StrategyDecision::recompress("Source file has no main subimage");
    };

    let output: BTreeSet<&str> = spec.channels.iter().map(|c| c.source.channel_name.as_str()).collect();
    let source: BTreeSet<&str> = main.channel_names().into_iter().collect();
    if output != source {
        return StrategyDecision::recompress("Output is subset/superset of source channels");
    }

    if !probe.compression.eq_ignore_ascii_case(&spec.compression) {
        return StrategyDecision::recompress(format!(
            "Compression mismatch: {} vs {}", probe.compression, spec.compression));
    }

    if spec.attributes.len() != probe.attributes.len() {
        return StrategyDecision::recompress(format!(
            "Attribute count mismatch: {} vs {}", probe.attributes.len(), spec.attributes.len()));
    }
    if let Some(name) = spec.attributes.names().find(|name| !probe.attributes.contains(name)) {
        return StrategyDecision::recompress(format!("Attribute '{}' modified or added", name));
    }

    if spec.channels.iter().any(|c| c.format_override.is_some()) {
        return StrategyDecision::recompress("Output channel format override present");
    }

    StrategyDecision::copy()
}
