pub mod io;
pub mod tiff;
pub mod compression;
pub mod codec;
pub mod model;
pub mod validation;
pub mod discovery;
pub mod export;
pub mod config;
pub mod utils;
pub mod commands;

pub use codec::{ImageCodec, OutputImage};
pub use config::{ExportJob, JobFile};
pub use export::{ExportEvent, ExportManager, ExportOutcome, ExportStatus};
pub use model::{ExportSpec, SequenceSet, SequenceSpec};
pub use tiff::TiffCodec;
pub use validation::ValidationEngine;
