//! Thread-safe frame progress counter

use std::sync::Mutex;

/// Counts completed frames of a run
///
/// One tracker spans a whole run, including a fallback from direct copy to
/// the worker pool, so the percentage never restarts.
#[derive(Debug)]
pub struct ProgressTracker {
    total: usize,
    completed: Mutex<usize>,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        ProgressTracker { total, completed: Mutex::new(0) }
    }

    /// Records one completed frame and returns the new percentage
    pub fn increment(&self) -> u8 {
        let mut completed = self.completed.lock().unwrap_or_else(|e| e.into_inner());
        *completed += 1;
        Self::percent_of(*completed, self.total)
    }

    pub fn completed(&self) -> usize {
        *self.completed.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn percent(&self) -> u8 {
        Self::percent_of(self.completed(), self.total)
    }

    /// `floor(completed * 100 / total)`, capped at 100
    fn percent_of(completed: usize, total: usize) -> u8 {
        if total == 0 {
            return 100;
        }
        (completed.saturating_mul(100) / total).min(100) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_percent_is_floored() {
        let tracker = ProgressTracker::new(3);
        assert_eq!(tracker.increment(), 33);
        assert_eq!(tracker.increment(), 66);
        assert_eq!(tracker.increment(), 100);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let tracker = Arc::new(ProgressTracker::new(800));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || {
                    let mut last = 0;
                    for _ in 0..100 {
                        let percent = tracker.increment();
                        assert!(percent >= last);
                        last = percent;
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(tracker.completed(), 800);
        assert_eq!(tracker.percent(), 100);
    }
}
