//! Data model shared by validation, discovery and export

pub mod attributes;
pub mod export_spec;
pub mod pattern;
pub mod probe;
pub mod sequence;

pub use attributes::AttributeSet;
pub use export_spec::{ChannelSourceRef, CompressionPolicy, ExportSpec, FrameRangePolicy, OutputChannel};
pub use pattern::SequencePattern;
pub use probe::{ChannelFormat, ChannelSpec, FileProbe, SubImageProbe};
pub use sequence::{SequenceSet, SequenceSpec};
