//! Frame-numbered filename patterns
//!
//! A pattern carries one frame token: printf style (`shot_%04d.tif`) or a
//! run of placeholders (`shot_####.tif`), both zero padded to the token
//! width.

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

lazy_static! {
    static ref TOKEN_RE: Regex = Regex::new(r"%0?(\d*)d|#+").expect("valid token regex");
    static ref TRAILING_DIGITS_RE: Regex = Regex::new(r"^(.*?)(\d+)$").expect("valid digit regex");
}

/// Location and width of the frame token inside a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameToken {
    pub start: usize,
    pub end: usize,
    pub width: usize,
}

/// A filename pattern with a frame-number token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SequencePattern {
    raw: String,
}

impl SequencePattern {
    pub fn new(raw: impl Into<String>) -> Self {
        SequencePattern { raw: raw.into() }
    }

    /// Builds a `%0Nd` pattern from a concrete filename
    ///
    /// The digit run directly before the extension becomes the token.
    /// Returns the pattern and the frame number, or `None` without digits.
    pub fn from_filename(filename: &str) -> Option<(SequencePattern, u32)> {
        let (stem, extension) = match filename.rfind('.') {
            Some(dot) => filename.split_at(dot),
            None => (filename, ""),
        };
        let caps = TRAILING_DIGITS_RE.captures(stem)?;
        let digits = caps.get(2)?.as_str();
        let frame = digits.parse::<u32>().ok()?;
        let raw = format!("{}%0{}d{}", &caps[1], digits.len(), extension);
        Some((SequencePattern::new(raw), frame))
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The first frame token of the pattern
    pub fn token(&self) -> Option<FrameToken> {
        let caps = TOKEN_RE.captures(&self.raw)?;
        let whole = caps.get(0)?;
        let width = match caps.get(1) {
            Some(digits) if !digits.as_str().is_empty() => digits.as_str().parse().unwrap_or(1),
            Some(_) => 1,
            None => whole.len(),
        };
        Some(FrameToken { start: whole.start(), end: whole.end(), width })
    }

    pub fn has_frame_token(&self) -> bool {
        self.token().is_some()
    }

    /// Substitutes a frame number for the token
    ///
    /// A pattern without a token formats to itself.
    pub fn format(&self, frame: u32) -> String {
        match self.token() {
            Some(token) => format!(
                "{}{:0width$}{}",
                &self.raw[..token.start],
                frame,
                &self.raw[token.end..],
                width = token.width
            ),
            None => self.raw.clone(),
        }
    }

    /// Anchored regex matching filenames of this pattern, frame in group 1
    pub fn to_regex(&self) -> Option<Regex> {
        let token = self.token()?;
        let source = format!(
            "^{}(\\d+){}$",
            regex::escape(&self.raw[..token.start]),
            regex::escape(&self.raw[token.end..])
        );
        Regex::new(&source).ok()
    }

    /// Recovers the frame number from a filename of this pattern
    pub fn parse(&self, filename: &str) -> Option<u32> {
        let regex = self.to_regex()?;
        regex.captures(filename)?.get(1)?.as_str().parse().ok()
    }
}

impl fmt::Display for SequencePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for SequencePattern {
    fn from(raw: &str) -> Self {
        SequencePattern::new(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printf_round_trip() {
        let pattern = SequencePattern::new("beauty.%04d.tif");
        assert_eq!(pattern.format(7), "beauty.0007.tif");
        assert_eq!(pattern.parse("beauty.0007.tif"), Some(7));
    }

    #[test]
    fn test_hash_run() {
        let pattern = SequencePattern::new("plate_###.tiff");
        assert_eq!(pattern.token().map(|t| t.width), Some(3));
        assert_eq!(pattern.format(42), "plate_042.tiff");
        assert_eq!(pattern.parse("plate_042.tiff"), Some(42));
    }

    #[test]
    fn test_wider_frame_than_padding() {
        let pattern = SequencePattern::new("f_%02d.tif");
        assert_eq!(pattern.format(1234), "f_1234.tif");
        assert_eq!(pattern.parse("f_1234.tif"), Some(1234));
    }

    #[test]
    fn test_rejects_foreign_names() {
        let pattern = SequencePattern::new("beauty.%04d.tif");
        assert_eq!(pattern.parse("beauty.0007.tiff"), None);
        assert_eq!(pattern.parse("other.0007.tif"), None);
        assert_eq!(pattern.parse("beauty.abcd.tif"), None);
    }

    #[test]
    fn test_pattern_without_token() {
        let pattern = SequencePattern::new("still.tif");
        assert!(!pattern.has_frame_token());
        assert_eq!(pattern.format(3), "still.tif");
        assert_eq!(pattern.parse("still.tif"), None);
    }

    #[test]
    fn test_from_filename() {
        let (pattern, frame) = SequencePattern::from_filename("shot_v2.1001.tif").unwrap();
        assert_eq!(pattern.as_str(), "shot_v2.%04d.tif");
        assert_eq!(frame, 1001);
        assert!(SequencePattern::from_filename("notes.txt").is_none());
        assert!(SequencePattern::from_filename("take_01_final.tif").is_none());
    }
}
