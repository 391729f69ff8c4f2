use serde::Serialize;

/// One grouped caption row as read from a feedback partition.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionGroup {
    pub caption: String,
    pub feedback_count: i64,
    pub avg_rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRankingItem {
    pub rank: usize,
    pub caption: String,
    pub feedback_count: i64,
    pub avg_rating: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    pub items: Vec<FeedbackRankingItem>,
    pub total_feedback: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReport {
    pub month: String,
    pub month_number: u32,
    pub report_data: ReportData,
    pub visitors: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Top3Report {
    pub year: i32,
    pub mall: String,
    pub monthly: Vec<MonthlyReport>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSet {
    pub years: Vec<i32>,
    pub malls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_mall: Option<String>,
}
