use indicatif::{ProgressBar, ProgressStyle};

/// Console progress bar for an export run, driven by percentages
pub struct ProgressDisplay {
    bar: ProgressBar,
}

impl ProgressDisplay {
    pub fn new(description: &str) -> Self {
        let bar = ProgressBar::new(100);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.set_message(description.to_string());

        ProgressDisplay { bar }
    }

    /// A display that draws nothing
    pub fn hidden() -> Self {
        ProgressDisplay { bar: ProgressBar::hidden() }
    }

    pub fn update(&self, percent: u8, msg: &str) {
        self.bar.set_position(u64::from(percent.min(100)));
        self.bar.set_message(msg.to_string());
    }

    pub fn finish(&self, msg: &str) {
        self.bar.finish_with_message(msg.to_string());
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_clamps_percentage() {
        let display = ProgressDisplay::hidden();
        display.update(40, "Frame 2");
        assert_eq!(display.position(), 40);
        display.update(250, "Frame 5");
        assert_eq!(display.position(), 100);
    }
}
