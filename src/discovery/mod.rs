//! Image sequence discovery on disk
//!
//! Large directories are scanned in parallel chunks on a rayon pool sized
//! by `scan_workers`; small ones are scanned on the calling thread.

use log::{debug, warn};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::SequencePattern;

/// Extensions recognised as image files
pub const IMAGE_EXTENSIONS: [&str; 6] = ["tif", "tiff", "exr", "png", "jpg", "jpeg"];

/// Fewest files worth a parallel scan
const PARALLEL_SCAN_THRESHOLD: usize = 100;

/// Smallest chunk handed to one scan worker
const MIN_CHUNK: usize = 50;

/// A sequence found by `discover_sequences`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredSequence {
    pub pattern: SequencePattern,
    pub directory: PathBuf,
    pub frames: Vec<u32>,
}

/// Worker count for scanning `file_count` files
pub fn scan_workers(file_count: usize) -> usize {
    let cores = num_cores();
    if file_count < PARALLEL_SCAN_THRESHOLD {
        1
    } else if file_count < 1000 {
        cores.min(4)
    } else {
        cores.min(8)
    }
}

pub(crate) fn num_cores() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

fn is_image_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Sorted names of the regular files in `directory`; empty if unreadable
fn list_files(directory: &Path) -> Vec<String> {
    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot read directory {}: {}", directory.display(), e);
            return Vec::new();
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();
    names
}

/// Applies `scan` to chunks of `names`, in parallel for large inputs
fn scan_chunks<T, F, M>(names: &[String], scan: F, merge: M) -> T
where
    T: Default + Send,
    F: Fn(&[String]) -> T + Sync,
    M: Fn(T, T) -> T + Sync,
{
    let workers = scan_workers(names.len());
    if workers <= 1 {
        return scan(names);
    }

    let chunk_size = (names.len() / workers).max(MIN_CHUNK);
    let pool = match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool,
        Err(e) => {
            warn!("Scan pool unavailable ({}), scanning sequentially", e);
            return scan(names);
        }
    };

    debug!("Scanning {} files with {} workers", names.len(), workers);
    pool.install(|| {
        names
            .par_chunks(chunk_size)
            .map(|chunk| scan(chunk))
            .reduce(T::default, |a, b| merge(a, b))
    })
}

/// Frame numbers of the files in `directory` matching `pattern`
///
/// Sorted and unique. A missing directory or a pattern without a frame
/// token yields no frames.
pub fn discover_frames(pattern: &SequencePattern, directory: &Path) -> Vec<u32> {
    let Some(regex) = pattern.to_regex() else {
        warn!("Pattern '{}' has no frame token", pattern);
        return Vec::new();
    };

    let names = list_files(directory);
    let frames: BTreeSet<u32> = scan_chunks(
        &names,
        |chunk| {
            chunk
                .iter()
                .filter_map(|name| regex.captures(name))
                .filter_map(|caps| caps.get(1).and_then(|m| m.as_str().parse().ok()))
                .collect::<BTreeSet<u32>>()
        },
        |mut a, b| {
            a.extend(b);
            a
        },
    );

    frames.into_iter().collect()
}

/// Groups the image files of `directory` into numbered sequences
///
/// Results are ordered by pattern.
pub fn discover_sequences(directory: &Path) -> Vec<DiscoveredSequence> {
    let names: Vec<String> = list_files(directory).into_iter().filter(|n| is_image_file(n)).collect();
    if names.is_empty() {
        return Vec::new();
    }

    let grouped: BTreeMap<String, BTreeSet<u32>> = scan_chunks(
        &names,
        |chunk| {
            let mut groups: BTreeMap<String, BTreeSet<u32>> = BTreeMap::new();
            for name in chunk {
                if let Some((pattern, frame)) = SequencePattern::from_filename(name) {
                    groups.entry(pattern.as_str().to_string()).or_default().insert(frame);
                }
            }
            groups
        },
        |mut a, b| {
            for (pattern, frames) in b {
                a.entry(pattern).or_default().extend(frames);
            }
            a
        },
    );

    grouped
        .into_iter()
        .map(|(pattern, frames)| DiscoveredSequence {
            pattern: SequencePattern::new(pattern),
            directory: directory.to_path_buf(),
            frames: frames.into_iter().collect(),
        })
        .collect()
}
