//! Utility modules for the command-line front end

pub mod logger;
pub mod progress;

pub use logger::Logger;
pub use progress::ProgressDisplay;
