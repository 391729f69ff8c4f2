use std::io::Write;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use crate::models::Top3Report;

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    year: i32,
    mall: &'a str,
    month: u32,
    rank: Option<usize>,
    caption: &'a str,
    feedback_count: Option<i64>,
    avg_rating: Option<f64>,
    total_feedback: i64,
    visitors: i64,
}

/// One row per ranked caption; months with no captions get a single blank row
/// so their totals still appear.
pub fn write_rows<W: Write>(writer: W, report: &Top3Report) -> anyhow::Result<usize> {
    let mut writer = csv::Writer::from_writer(writer);
    let mut written = 0usize;

    for month in &report.monthly {
        let base = ExportRow {
            year: report.year,
            mall: &report.mall,
            month: month.month_number,
            rank: None,
            caption: "",
            feedback_count: None,
            avg_rating: None,
            total_feedback: month.report_data.total_feedback,
            visitors: month.visitors,
        };

        if month.report_data.items.is_empty() {
            writer.serialize(&base)?;
            written += 1;
            continue;
        }

        for item in &month.report_data.items {
            writer.serialize(ExportRow {
                rank: Some(item.rank),
                caption: &item.caption,
                feedback_count: Some(item.feedback_count),
                avg_rating: item.avg_rating,
                ..base
            })?;
            written += 1;
        }
    }

    writer.flush()?;
    Ok(written)
}

pub fn write_csv(path: &Path, report: &Top3Report) -> anyhow::Result<usize> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_rows(file, report)
}
