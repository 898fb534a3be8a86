//! # Report Output
//!
//! Renders an [`EvaluationReport`] as pretty JSON or a self-contained HTML
//! page and writes it next to the other reports of the run.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    config::ReportConfig,
    error::{ReportError, Result},
    evaluation::{EvaluationReport, PairReport, SkippedPair},
};

/// Output format of a report file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    Html,
    Json,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Json => "json",
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown report format '{}' (expected html or json)", other)),
        }
    }
}

/// Writes one file per requested format under a common base name
#[derive(Debug, Clone)]
pub struct ReportWriter {
    folder: PathBuf,
    name: String,
    formats: Vec<ReportFormat>,
}

impl ReportWriter {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(folder: P, name: S, mut formats: Vec<ReportFormat>) -> Self {
        formats.dedup();
        Self {
            folder: folder.into(),
            name: name.into(),
            formats,
        }
    }

    /// Resolve folder and file name from the report configuration
    pub fn from_config(config: &ReportConfig, generated_at: &DateTime<Local>) -> Result<Self> {
        Ok(Self::new(
            config.resolve_folder()?,
            config.resolve_name(generated_at),
            config.formats.clone(),
        ))
    }

    pub fn path_for(&self, format: ReportFormat) -> PathBuf {
        self.folder.join(format!("{}.{}", self.name, format.extension()))
    }

    /// Write every configured format, returning the paths in format order
    pub fn write(&self, report: &EvaluationReport) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.formats.len());

        for &format in &self.formats {
            let path = self.path_for(format);
            let content = match format {
                ReportFormat::Html => render_html(report),
                ReportFormat::Json => render_json(report, &path)?,
            };

            std::fs::write(&path, content).map_err(|e| write_failed(&path, e))?;
            info!("Report written to {}", path.display());
            written.push(path);
        }

        Ok(written)
    }
}

fn write_failed<E: std::fmt::Display>(path: &Path, reason: E) -> ReportError {
    ReportError::WriteFailed {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

/// Pretty-printed JSON document of the whole run
pub fn render_json(report: &EvaluationReport, path: &Path) -> Result<String> {
    Ok(serde_json::to_string_pretty(report).map_err(|e| write_failed(path, e))?)
}

const STYLE: &str = "body{font-family:sans-serif;margin:2em;color:#222}\
table{border-collapse:collapse;margin:0 0 1.5em}\
th,td{border:1px solid #bbb;padding:4px 10px;text-align:left}\
th{background:#eee}\
.poor{color:#b00020}\
details{margin-bottom:2em}";

/// Self-contained HTML page of the whole run
pub fn render_html(report: &EvaluationReport) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>PSNR report</title>\n");
    html.push_str(&format!("<style>{}</style>\n</head>\n<body>\n", STYLE));
    html.push_str("<h1>PSNR report</h1>\n");
    html.push_str(&format!(
        "<p>Generated {}. Total videos: {}, evaluated: {}, skipped: {}.</p>\n",
        escape_html(&report.generated_at.format("%Y-%m-%d %H:%M:%S").to_string()),
        report.total_videos,
        report.evaluated().count(),
        report.skipped().count()
    ));

    for pair in report.evaluated() {
        html.push_str(&render_pair(pair));
    }

    let skipped: Vec<&SkippedPair> = report.skipped().collect();
    if !skipped.is_empty() {
        html.push_str("<h2>Skipped</h2>\n<ul>\n");
        for pair in skipped {
            html.push_str(&format!(
                "<li>#{} {} / {}: {}</li>\n",
                pair.index,
                escape_html(&pair.reference),
                escape_html(&pair.compressed),
                escape_html(&pair.reason)
            ));
        }
        html.push_str("</ul>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_pair(pair: &PairReport) -> String {
    let mut html = format!("<h2>#{} {}</h2>\n<table>\n", pair.index, escape_html(&pair.compressed));

    let rows = [
        ("original", escape_html(&pair.reference)),
        ("compressed", escape_html(&pair.compressed)),
        ("Number of frames reference", pair.reference_frames.to_string()),
        ("Number of frames compressed", pair.compressed_frames.to_string()),
        ("Number of processed frames", pair.processed_frames.to_string()),
        ("max PSNR, dB", pair.max_psnr.to_string()),
        ("min PSNR, dB", pair.min_psnr.to_string()),
        ("median PSNR, dB", pair.median_psnr.to_string()),
    ];
    for (label, value) in rows {
        html.push_str(&format!("<tr><th>{}</th><td>{}</td></tr>\n", label, value));
    }
    html.push_str(&format!(
        "<tr><th>Ratio of PSNR being below {} dB, %</th><td>{}</td></tr>\n",
        pair.threshold, pair.ratio_below_threshold
    ));
    if let Some(short) = &pair.short_read {
        let sides: Vec<String> = short.exhausted.iter().map(|side| side.to_string()).collect();
        html.push_str(&format!(
            "<tr><th>Stopped at frame</th><td>{} ({} ended{})</td></tr>\n",
            short.frame_index,
            sides.join(" and "),
            if short.premature { " before its reported length" } else { "" }
        ));
    }
    html.push_str("</table>\n");

    html.push_str("<details>\n<summary>PSNR per frame</summary>\n<table>\n");
    html.push_str("<tr><th>Frame</th><th>PSNR, dB</th></tr>\n");
    for sample in pair.frames.iter() {
        let class = if sample.value < pair.threshold { " class=\"poor\"" } else { "" };
        html.push_str(&format!(
            "<tr{}><td>{}</td><td>{}</td></tr>\n",
            class, sample.frame_index, sample.value
        ));
    }
    html.push_str("</table>\n</details>\n");
    html
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QualityError;
    use crate::evaluation::PairOutcome;
    use crate::metrics::PsnrSequence;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn sample_report() -> EvaluationReport {
        let frames = PsnrSequence::from_values([0.0, 42.125, 28.5]);
        EvaluationReport {
            generated_at: Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap(),
            total_videos: 2,
            outcomes: vec![
                PairOutcome::Evaluated(PairReport {
                    index: 0,
                    reference: "ref.mov".to_string(),
                    compressed: "<cmp>.mp4".to_string(),
                    threshold: 30.0,
                    reference_frames: 3,
                    compressed_frames: 3,
                    processed_frames: 3,
                    max_psnr: 42.125,
                    min_psnr: 0.0,
                    median_psnr: 28.5,
                    frames_below_threshold: 2,
                    ratio_below_threshold: 66.667,
                    short_read: None,
                    frames,
                }),
                PairOutcome::Skipped(SkippedPair {
                    index: 1,
                    reference: "a.mov".to_string(),
                    compressed: "b&c.mp4".to_string(),
                    reason: "Could not open b&c.mp4: missing".to_string(),
                }),
            ],
        }
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("HTML".parse::<ReportFormat>().unwrap(), ReportFormat::Html);
        assert_eq!("json".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert!("pdf".parse::<ReportFormat>().is_err());
        assert_eq!(ReportFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_html_contains_summary_and_escapes() {
        let html = render_html(&sample_report());
        assert!(html.contains("Total videos: 2, evaluated: 1, skipped: 1"));
        assert!(html.contains("Ratio of PSNR being below 30 dB, %</th><td>66.667"));
        assert!(html.contains("&lt;cmp&gt;.mp4"));
        assert!(!html.contains("<cmp>"));
        assert!(html.contains("b&amp;c.mp4"));
        assert!(html.contains("<tr class=\"poor\"><td>2</td><td>28.5</td></tr>"));
    }

    #[test]
    fn test_json_roundtrip_keeps_outcomes() {
        let report = sample_report();
        let json = render_json(&report, Path::new("report.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["total_videos"], 2);
        assert_eq!(value["outcomes"][0]["status"], "evaluated");
        assert_eq!(value["outcomes"][0]["frames"][1]["value"], 42.125);
        assert_eq!(value["outcomes"][1]["status"], "skipped");
    }

    #[test]
    fn test_writer_writes_requested_formats() {
        let dir = tempdir().unwrap();
        let writer = ReportWriter::new(dir.path(), "nightly", vec![ReportFormat::Html, ReportFormat::Json]);

        let paths = writer.write(&sample_report()).unwrap();
        assert_eq!(paths, vec![dir.path().join("nightly.html"), dir.path().join("nightly.json")]);
        for path in &paths {
            assert!(path.is_file());
        }
    }

    #[test]
    fn test_writer_from_config_uses_timestamped_name() {
        let dir = tempdir().unwrap();
        let config = ReportConfig {
            folder: Some(dir.path().to_path_buf()),
            name: None,
            formats: vec![ReportFormat::Json],
        };
        let now = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let writer = ReportWriter::from_config(&config, &now).unwrap();
        assert_eq!(
            writer.path_for(ReportFormat::Json),
            dir.path().join("report_20240305_14_07_09.json")
        );
    }

    #[test]
    fn test_write_failure_is_reported() {
        let dir = tempdir().unwrap();
        let writer = ReportWriter::new(dir.path().join("missing"), "r", vec![ReportFormat::Html]);
        let err = writer.write(&sample_report()).unwrap_err();
        assert!(matches!(err, QualityError::Report(ReportError::WriteFailed { .. })));
    }
}
