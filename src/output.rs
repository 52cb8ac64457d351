//! CLI output formatting for `check` runs.
//!
//! Every file gets a header line (positional index + path) followed by
//! indented context lines:
//!
//! ```text
//! 001 photos/beach.jpg
//!     Accepted: 1200x800, 240.5 KB
//!     SHA-256: 9f86d081884c7d65…
//! 002 photos/panorama.png
//!     Compressed: 3000x1000, 6 MB → 1.21 MB
//!     SHA-256: 2c26b46b68ffc68f…
//!     Written: out/panorama.png
//! 003 photos/icon.gif
//!     Rejected (too_small): Image is too small. Minimum size is 100x100 pixels
//!
//! Checked 3 files: 2 accepted (1 compressed), 1 rejected
//! ```
//!
//! `format_*` functions return lines and do no I/O; `print_*` wrappers write
//! them to stdout.

use crate::error::UploadError;
use crate::pipeline::Accepted;
use crate::validate::format_file_size;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Result of checking one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub path: String,
    pub original_bytes: u64,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Accepted {
        width: u32,
        height: u32,
        compressed: bool,
        final_bytes: u64,
        /// Hex SHA-256 of the accepted output.
        sha256: String,
        written: Option<String>,
    },
    Rejected {
        code: &'static str,
        message: String,
    },
}

impl FileReport {
    pub fn accepted(path: &Path, original_bytes: u64, accepted: &Accepted, bytes: &[u8]) -> Self {
        Self {
            path: path.display().to_string(),
            original_bytes,
            outcome: FileOutcome::Accepted {
                width: accepted.original.width,
                height: accepted.original.height,
                compressed: accepted.compressed,
                final_bytes: bytes.len() as u64,
                sha256: format!("{:x}", Sha256::digest(bytes)),
                written: None,
            },
        }
    }

    pub fn rejected(path: &Path, original_bytes: u64, error: &UploadError) -> Self {
        Self {
            path: path.display().to_string(),
            original_bytes,
            outcome: FileOutcome::Rejected {
                code: error.code(),
                message: error.to_string(),
            },
        }
    }

    /// Record where the accepted output was written.
    pub fn with_written(mut self, dest: &Path) -> Self {
        if let FileOutcome::Accepted { written, .. } = &mut self.outcome {
            *written = Some(dest.display().to_string());
        }
        self
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self.outcome, FileOutcome::Accepted { .. })
    }
}

/// Totals over a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckSummary {
    pub checked: usize,
    pub accepted: usize,
    pub compressed: usize,
    pub rejected: usize,
}

impl CheckSummary {
    pub fn from_reports(reports: &[FileReport]) -> Self {
        reports.iter().fold(Self::default(), |mut s, r| {
            s.checked += 1;
            match r.outcome {
                FileOutcome::Accepted { compressed, .. } => {
                    s.accepted += 1;
                    if compressed {
                        s.compressed += 1;
                    }
                }
                FileOutcome::Rejected { .. } => s.rejected += 1,
            }
            s
        })
    }
}

fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Lines for one file, `index` being 1-based.
pub fn format_file_report(index: usize, report: &FileReport) -> Vec<String> {
    let mut lines = vec![format!("{} {}", format_index(index), report.path)];
    match &report.outcome {
        FileOutcome::Accepted {
            width,
            height,
            compressed,
            final_bytes,
            sha256,
            written,
        } => {
            if *compressed {
                lines.push(format!(
                    "{}Compressed: {}x{}, {} → {}",
                    indent(1),
                    width,
                    height,
                    format_file_size(report.original_bytes),
                    format_file_size(*final_bytes)
                ));
            } else {
                lines.push(format!(
                    "{}Accepted: {}x{}, {}",
                    indent(1),
                    width,
                    height,
                    format_file_size(*final_bytes)
                ));
            }
            lines.push(format!("{}SHA-256: {}", indent(1), sha256));
            if let Some(dest) = written {
                lines.push(format!("{}Written: {}", indent(1), dest));
            }
        }
        FileOutcome::Rejected { code, message } => {
            lines.push(format!("{}Rejected ({}): {}", indent(1), code, message));
        }
    }
    lines
}

pub fn format_summary(summary: &CheckSummary) -> String {
    let noun = if summary.checked == 1 { "file" } else { "files" };
    format!(
        "Checked {} {}: {} accepted ({} compressed), {} rejected",
        summary.checked, noun, summary.accepted, summary.compressed, summary.rejected
    )
}

/// Full text report: every file, a blank line, then the summary.
pub fn format_check_output(reports: &[FileReport]) -> Vec<String> {
    let mut lines: Vec<String> = reports
        .iter()
        .enumerate()
        .flat_map(|(i, r)| format_file_report(i + 1, r))
        .collect();
    if !reports.is_empty() {
        lines.push(String::new());
    }
    lines.push(format_summary(&CheckSummary::from_reports(reports)));
    lines
}

#[derive(Serialize)]
struct JsonReport<'a> {
    files: &'a [FileReport],
    summary: CheckSummary,
}

/// Machine-readable report.
pub fn format_check_json(reports: &[FileReport]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport {
        files: reports,
        summary: CheckSummary::from_reports(reports),
    })
}

pub fn print_check_output(reports: &[FileReport]) {
    for line in format_check_output(reports) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DimensionViolation;
    use crate::imaging::ImageDimensions;
    use crate::types::CandidateFile;

    fn accepted(compressed: bool) -> Accepted {
        Accepted {
            file: CandidateFile::from_bytes("beach.jpg", "image/jpeg", b"abc".to_vec()),
            preview: String::new(),
            original: ImageDimensions {
                width: 1200,
                height: 800,
            },
            compressed,
        }
    }

    fn too_small() -> UploadError {
        UploadError::InvalidDimensions(DimensionViolation::TooSmall {
            min_width: 100,
            min_height: 100,
        })
    }

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1234), "1234");
    }

    #[test]
    fn accepted_report_has_digest() {
        let r = FileReport::accepted(Path::new("beach.jpg"), 3, &accepted(false), b"abc");
        let FileOutcome::Accepted { sha256, .. } = &r.outcome else {
            panic!("expected accepted");
        };
        assert_eq!(
            sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn accepted_lines() {
        let r = FileReport::accepted(Path::new("beach.jpg"), 3, &accepted(false), b"abc");
        let lines = format_file_report(1, &r);
        assert_eq!(lines[0], "001 beach.jpg");
        assert_eq!(lines[1], "    Accepted: 1200x800, 3 Bytes");
        assert!(lines[2].starts_with("    SHA-256: ba7816bf"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn compressed_lines_show_both_sizes() {
        let r = FileReport::accepted(Path::new("p.png"), 6 * 1024 * 1024, &accepted(true), &[0u8; 1536])
            .with_written(Path::new("out/p.png"));
        let lines = format_file_report(2, &r);
        assert_eq!(lines[1], "    Compressed: 1200x800, 6 MB → 1.5 KB");
        assert_eq!(lines[3], "    Written: out/p.png");
    }

    #[test]
    fn rejected_lines() {
        let r = FileReport::rejected(Path::new("icon.gif"), 10, &too_small());
        assert_eq!(
            format_file_report(3, &r),
            vec![
                "003 icon.gif".to_string(),
                "    Rejected (too_small): Image is too small. Minimum size is 100x100 pixels"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn with_written_ignores_rejections() {
        let r = FileReport::rejected(Path::new("a.bmp"), 1, &UploadError::UnreadableImage)
            .with_written(Path::new("out/a.bmp"));
        assert!(!r.is_accepted());
        assert!(matches!(r.outcome, FileOutcome::Rejected { .. }));
    }

    #[test]
    fn summary_counts() {
        let reports = vec![
            FileReport::accepted(Path::new("a.jpg"), 3, &accepted(false), b"abc"),
            FileReport::accepted(Path::new("b.jpg"), 3, &accepted(true), b"ab"),
            FileReport::rejected(Path::new("c.gif"), 3, &too_small()),
        ];
        let lines = format_check_output(&reports);
        assert_eq!(lines[lines.len() - 2], "");
        assert_eq!(
            lines.last().unwrap(),
            "Checked 3 files: 2 accepted (1 compressed), 1 rejected"
        );
    }

    #[test]
    fn empty_run_prints_only_summary() {
        assert_eq!(
            format_check_output(&[]),
            vec!["Checked 0 files: 0 accepted (0 compressed), 0 rejected".to_string()]
        );
    }

    #[test]
    fn json_is_tagged_by_status() {
        let reports = vec![
            FileReport::accepted(Path::new("a.jpg"), 3, &accepted(false), b"abc"),
            FileReport::rejected(Path::new("c.gif"), 3, &too_small()),
        ];
        let json: serde_json::Value =
            serde_json::from_str(&format_check_json(&reports).unwrap()).unwrap();

        assert_eq!(json["files"][0]["status"], "accepted");
        assert_eq!(json["files"][0]["width"], 1200);
        assert_eq!(json["files"][0]["path"], "a.jpg");
        assert_eq!(json["files"][1]["status"], "rejected");
        assert_eq!(json["files"][1]["code"], "too_small");
        assert_eq!(json["summary"]["rejected"], 1);
    }
}
