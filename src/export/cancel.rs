//! Cooperative cancellation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::errors::{ExportError, ExportResult};

/// Shared stop flag, checked before every unit of work
///
/// Clones observe the same flag. Cancelling is idempotent and cannot be
/// undone; a new run gets a new token.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once the token has been cancelled
    pub fn check(&self) -> ExportResult<()> {
        if self.is_cancelled() {
            Err(ExportError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_the_flag() {
        let token = CancelToken::new();
        let observer = token.clone();
        assert!(observer.check().is_ok());

        token.cancel();
        token.cancel();
        assert!(observer.is_cancelled());
        assert!(matches!(observer.check(), Err(ExportError::Cancelled)));
    }
}
