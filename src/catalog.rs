//! Partition naming and discovery.
//!
//! Monthly data lives in relations named `v_<YYYY>_<MM>_reports` and
//! `v_<YYYY>_<MM>_traffic`. A [`Partition`] is the only way to produce one of
//! those names, so nothing built from client input reaches a query string
//! without passing through the year/month checks below.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::error::DashboardError;
use crate::store::Store;

/// Regex handed to the store when listing partition relations.
pub const PARTITION_PATTERN: &str = "^v_[0-9]{4}_[0-9]{2}_(reports|traffic)$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionKind {
    Reports,
    Traffic,
}

impl PartitionKind {
    pub fn token(self) -> &'static str {
        match self {
            PartitionKind::Reports => "reports",
            PartitionKind::Traffic => "traffic",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "reports" => Some(PartitionKind::Reports),
            "traffic" => Some(PartitionKind::Traffic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Partition {
    year: i32,
    month: u32,
    kind: PartitionKind,
}

impl Partition {
    pub fn new(year: i32, month: u32, kind: PartitionKind) -> Result<Self, DashboardError> {
        validate_year(year)?;
        validate_month(month)?;
        Ok(Self { year, month, kind })
    }

    pub fn reports(year: i32, month: u32) -> Result<Self, DashboardError> {
        Self::new(year, month, PartitionKind::Reports)
    }

    pub fn traffic(year: i32, month: u32) -> Result<Self, DashboardError> {
        Self::new(year, month, PartitionKind::Traffic)
    }

    /// Parse a relation name. Anything not matching the naming convention
    /// exactly is rejected.
    pub fn parse(name: &str) -> Option<Self> {
        let rest = name.strip_prefix("v_")?;
        let mut parts = rest.splitn(3, '_');
        let year = parts.next()?;
        let month = parts.next()?;
        let kind = PartitionKind::from_token(parts.next()?)?;

        if year.len() != 4 || month.len() != 2 {
            return None;
        }
        if !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }

        let year: i32 = year.parse().ok()?;
        let month: u32 = month.parse().ok()?;
        Self::new(year, month, kind).ok()
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn kind(&self) -> PartitionKind {
        self.kind
    }

    pub fn relation_name(&self) -> String {
        format!("v_{:04}_{:02}_{}", self.year, self.month, self.kind.token())
    }

    /// The relation name as a quoted SQL identifier.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.relation_name())
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.relation_name())
    }
}

pub fn validate_year(year: i32) -> Result<(), DashboardError> {
    if (1..=9999).contains(&year) {
        Ok(())
    } else {
        Err(DashboardError::InvalidRequest(format!(
            "year must be between 1 and 9999, got {year}"
        )))
    }
}

pub fn validate_month(month: u32) -> Result<(), DashboardError> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(DashboardError::InvalidRequest(format!(
            "month must be between 1 and 12, got {month}"
        )))
    }
}

#[derive(Clone)]
pub struct PartitionCatalog {
    store: Arc<dyn Store>,
}

impl PartitionCatalog {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Years with at least one partition of either kind, ascending.
    pub async fn discover_years(&self) -> Result<Vec<i32>, DashboardError> {
        let names = self.store.partition_relations().await?;
        let years: BTreeSet<i32> = names
            .iter()
            .filter_map(|name| Partition::parse(name))
            .map(|partition| partition.year())
            .collect();
        Ok(years.into_iter().collect())
    }

    /// Malls present in the year's January feedback partition.
    ///
    /// Fails with [`DashboardError::MissingPartition`] when January has no
    /// partition; the caller decides how to degrade.
    pub async fn malls_for_year(&self, year: i32) -> Result<Vec<String>, DashboardError> {
        let partition = Partition::reports(year, 1)?;
        self.store.distinct_zones(&partition).await
    }
}
