//! Batch statistics over many input files
//!
//! Every file is read and encoded on the shared worker pool. A file that
//! fails is logged and left out of the report; the others still run.

use anyhow::{Context, Result};
use libvadpcm::{parallel, Encoder, Stats};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::read_pcm;

/// Encoding stats for one file
#[derive(Debug, Clone, Serialize)]
pub struct FileStats {
    pub file: PathBuf,
    pub signal_level_db: f64,
    pub error_level_db: f64,
    /// None when the encoding was exact
    pub snr_db: Option<f64>,
    #[serde(skip)]
    pub stats: Stats,
}

impl FileStats {
    fn new(file: &Path, stats: Stats) -> Self {
        FileStats {
            file: file.to_path_buf(),
            signal_level_db: stats.signal_level_db(),
            error_level_db: stats.error_level_db(),
            snr_db: stats.snr_db(),
            stats,
        }
    }
}

/// Result of a batch run
#[derive(Debug, Default)]
pub struct BatchReport {
    /// stats for files that encoded, in input order
    pub files: Vec<FileStats>,
    pub failures: usize,
}

/// Encode one file and return its stats
pub fn file_stats(path: &Path, predictor_count: usize) -> Result<Stats> {
    let audio = read_pcm(path)?;
    let encoded = Encoder::new()
        .with_predictor_count(predictor_count)
        .encode(&audio.samples)
        .context("Encoding failed")?;
    Ok(encoded.stats)
}

/// Collect stats for every file in parallel
pub fn collect_stats(paths: &[PathBuf], predictor_count: usize) -> BatchReport {
    let results = parallel::map(paths.len(), |i| {
        let path = &paths[i];
        let result = file_stats(path, predictor_count)
            .with_context(|| format!("Failed to process {}", path.display()));
        match &result {
            Ok(stats) => info!(
                file = %path.display(),
                snr_db = stats.snr_db().unwrap_or(f64::INFINITY),
                "encoded"
            ),
            Err(e) => error!("{:#}", e),
        }
        result
    });

    let mut report = BatchReport::default();
    for (path, result) in paths.iter().zip(results) {
        match result {
            Ok(stats) => report.files.push(FileStats::new(path, stats)),
            Err(_) => report.failures += 1,
        }
    }
    report
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// CSV table with one row per file: name and SNR in dB, or `None` for exact
/// encodings.
pub fn to_csv(files: &[FileStats]) -> String {
    let mut out = String::from("File,SNR dB\n");
    for entry in files {
        let snr = match entry.snr_db {
            Some(snr) => format!("{:.2}", snr),
            None => "None".to_string(),
        };
        out.push_str(&csv_field(&entry.file.to_string_lossy()));
        out.push(',');
        out.push_str(&snr);
        out.push('\n');
    }
    out
}

pub fn to_json(files: &[FileStats]) -> Result<String> {
    serde_json::to_string_pretty(files).context("Failed to serialize stats")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(file: &str, signal: f64, error: f64) -> FileStats {
        FileStats::new(
            Path::new(file),
            Stats {
                signal_mean_square: signal,
                error_mean_square: error,
            },
        )
    }

    #[test]
    fn test_csv() {
        let files = vec![entry("a.aiff", 0.1, 0.001), entry("b,c.wav", 0.1, 0.0)];
        let csv = to_csv(&files);
        assert_eq!(csv, "File,SNR dB\na.aiff,20.00\n\"b,c.wav\",None\n");
    }

    #[test]
    fn test_csv_field_quotes() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("x\ny"), "\"x\ny\"");
        assert_eq!(csv_field("a,\"b\""), "\"a,\"\"b\"\"\"");
    }

    #[test]
    fn test_json_skips_raw_stats() {
        let json = to_json(&[entry("a.aiff", 0.1, 0.001)]).unwrap();
        assert!(json.contains("\"snr_db\""));
        assert!(!json.contains("signal_mean_square"));
    }

    #[test]
    fn test_missing_files_fail_soft() {
        let paths = vec![
            PathBuf::from("/nonexistent/vadpcm-test-1.aiff"),
            PathBuf::from("/nonexistent/vadpcm-test-2.aiff"),
        ];
        let report = collect_stats(&paths, 4);
        assert!(report.files.is_empty());
        assert_eq!(report.failures, 2);
    }
}
