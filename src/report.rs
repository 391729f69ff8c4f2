use std::fmt::Write;
use std::sync::Arc;

use chrono::{DateTime, Month, Utc};
use futures::future::try_join_all;

use crate::catalog::{validate_month, validate_year, Partition};
use crate::error::DashboardError;
use crate::executor::PartitionExecutor;
use crate::models::{MonthlyReport, Top3Report};
use crate::store::Store;

/// Three-letter English month label, e.g. `Mar`.
pub fn month_label(month: u32) -> String {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.name()[..3].to_string())
        .unwrap_or_else(|| month.to_string())
}

pub fn target_months(month_filter: Option<u32>) -> Vec<u32> {
    match month_filter {
        Some(month) => vec![month],
        None => (1..=12).collect(),
    }
}

#[derive(Clone)]
pub struct ReportOrchestrator {
    executor: PartitionExecutor,
}

impl ReportOrchestrator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            executor: PartitionExecutor::new(store),
        }
    }

    pub async fn build_report(
        &self,
        year: i32,
        mall: &str,
        month_filter: Option<u32>,
    ) -> Result<Top3Report, DashboardError> {
        validate_year(year)?;
        if mall.trim().is_empty() {
            return Err(DashboardError::InvalidRequest(
                "year and mall are required".to_string(),
            ));
        }
        if let Some(month) = month_filter {
            validate_month(month)?;
        }

        let months = target_months(month_filter);
        tracing::debug!(year, mall, months = months.len(), "building report");

        let monthly = try_join_all(months.into_iter().map(|month| self.build_month(year, mall, month)))
            .await?;

        Ok(Top3Report {
            year,
            mall: mall.to_string(),
            monthly,
        })
    }

    async fn build_month(
        &self,
        year: i32,
        mall: &str,
        month: u32,
    ) -> Result<MonthlyReport, DashboardError> {
        let reports = Partition::reports(year, month)?;
        let traffic = Partition::traffic(year, month)?;

        let (report_data, visitors) = tokio::try_join!(
            self.executor.rank_top_captions(&reports, mall),
            self.executor.sum_visitors(&traffic, mall),
        )?;

        Ok(MonthlyReport {
            month: month_label(month),
            month_number: month,
            report_data: report_data.unwrap_or_empty(),
            visitors,
        })
    }
}

pub fn render_markdown(report: &Top3Report, generated_at: DateTime<Utc>) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Mall Feedback Report");
    let _ = writeln!(
        output,
        "Generated for {} in {} ({})",
        report.mall,
        report.year,
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );

    for month in &report.monthly {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {} {}", month.month, report.year);
        let _ = writeln!(
            output,
            "Feedback: {} / Visitors: {}",
            month.report_data.total_feedback, month.visitors
        );

        if month.report_data.items.is_empty() {
            let _ = writeln!(output, "No feedback for this month.");
            continue;
        }

        for item in &month.report_data.items {
            let rating = item
                .avg_rating
                .map(|value| format!("{value:.2}"))
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                output,
                "{}. {} (avg rating {}, {} feedback)",
                item.rank, item.caption, rating, item.feedback_count
            );
        }
    }

    output
}
