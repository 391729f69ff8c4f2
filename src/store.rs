use async_trait::async_trait;

use crate::catalog::Partition;
use crate::error::DashboardError;
use crate::models::CaptionGroup;

/// Read-only access to the per-month partition relations.
///
/// Every method that names a partition fails with
/// [`DashboardError::MissingPartition`] when the relation does not exist.
#[async_trait]
pub trait Store: Send + Sync {
    /// Relation names from the schema metadata that look like partitions.
    async fn partition_relations(&self) -> Result<Vec<String>, DashboardError>;

    /// Caption groups for `mall`, best first, at most `limit` of them.
    async fn caption_groups(
        &self,
        partition: &Partition,
        mall: &str,
        limit: i64,
    ) -> Result<Vec<CaptionGroup>, DashboardError>;

    /// Count of every feedback row for `mall`, captioned or not.
    async fn feedback_total(&self, partition: &Partition, mall: &str)
        -> Result<i64, DashboardError>;

    async fn visitor_sum(&self, partition: &Partition, mall: &str) -> Result<i64, DashboardError>;

    /// Distinct non-empty zones, alphabetical.
    async fn distinct_zones(&self, partition: &Partition) -> Result<Vec<String>, DashboardError>;
}

#[cfg(test)]
pub mod fake {
    use std::collections::{BTreeMap, BTreeSet};

    use super::*;
    use crate::catalog::PartitionKind;

    #[derive(Debug, Clone)]
    struct FeedbackRow {
        zone: String,
        caption: Option<String>,
        rating: Option<f64>,
    }

    #[derive(Debug, Clone)]
    struct TrafficRow {
        mall: String,
        visitors: i64,
    }

    /// In-memory stand-in for the Postgres views.
    ///
    /// Caption groups come back in caption order, unranked.
    #[derive(Debug, Default)]
    pub struct MemoryStore {
        relations: BTreeSet<String>,
        feedback: BTreeMap<String, Vec<FeedbackRow>>,
        traffic: BTreeMap<String, Vec<TrafficRow>>,
        offline: bool,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every call fails as if the database were unreachable.
        pub fn offline(mut self) -> Self {
            self.offline = true;
            self
        }

        pub fn with_relation(mut self, name: &str) -> Self {
            self.relations.insert(name.to_string());
            self
        }

        pub fn with_feedback(
            mut self,
            year: i32,
            month: u32,
            zone: &str,
            caption: Option<&str>,
            rating: Option<f64>,
        ) -> Self {
            let name = Partition::reports(year, month).unwrap().relation_name();
            self.relations.insert(name.clone());
            self.feedback.entry(name).or_default().push(FeedbackRow {
                zone: zone.to_string(),
                caption: caption.map(str::to_string),
                rating,
            });
            self
        }

        /// Adds `count` identical feedback rows.
        pub fn with_feedback_n(
            mut self,
            year: i32,
            month: u32,
            zone: &str,
            caption: &str,
            rating: f64,
            count: usize,
        ) -> Self {
            for _ in 0..count {
                self = self.with_feedback(year, month, zone, Some(caption), Some(rating));
            }
            self
        }

        pub fn with_traffic(mut self, year: i32, month: u32, mall: &str, visitors: i64) -> Self {
            let name = Partition::traffic(year, month).unwrap().relation_name();
            self.relations.insert(name.clone());
            self.traffic.entry(name).or_default().push(TrafficRow {
                mall: mall.to_string(),
                visitors,
            });
            self
        }

        fn check_online(&self) -> Result<(), DashboardError> {
            if self.offline {
                Err(DashboardError::StoreUnavailable(sqlx::Error::PoolTimedOut))
            } else {
                Ok(())
            }
        }

        fn feedback_rows(&self, partition: &Partition) -> Result<&[FeedbackRow], DashboardError> {
            self.check_online()?;
            let name = partition.relation_name();
            if partition.kind() != PartitionKind::Reports || !self.relations.contains(&name) {
                return Err(DashboardError::MissingPartition(name));
            }
            Ok(self.feedback.get(&name).map(Vec::as_slice).unwrap_or_default())
        }
    }

    #[async_trait]
    impl Store for MemoryStore {
        async fn partition_relations(&self) -> Result<Vec<String>, DashboardError> {
            self.check_online()?;
            Ok(self.relations.iter().cloned().collect())
        }

        async fn caption_groups(
            &self,
            partition: &Partition,
            mall: &str,
            _limit: i64,
        ) -> Result<Vec<CaptionGroup>, DashboardError> {
            let mut groups: BTreeMap<&str, (i64, f64, usize)> = BTreeMap::new();
            for row in self.feedback_rows(partition)? {
                let Some(caption) = row.caption.as_deref().filter(|c| !c.is_empty()) else {
                    continue;
                };
                if row.zone != mall {
                    continue;
                }
                let entry = groups.entry(caption).or_insert((0, 0.0, 0));
                entry.0 += 1;
                if let Some(rating) = row.rating {
                    entry.1 += rating;
                    entry.2 += 1;
                }
            }

            Ok(groups
                .into_iter()
                .map(|(caption, (count, rating_sum, rated))| CaptionGroup {
                    caption: caption.to_string(),
                    feedback_count: count,
                    avg_rating: (rated > 0).then(|| rating_sum / rated as f64),
                })
                .collect())
        }

        async fn feedback_total(
            &self,
            partition: &Partition,
            mall: &str,
        ) -> Result<i64, DashboardError> {
            let rows = self.feedback_rows(partition)?;
            Ok(rows.iter().filter(|row| row.zone == mall).count() as i64)
        }

        async fn visitor_sum(
            &self,
            partition: &Partition,
            mall: &str,
        ) -> Result<i64, DashboardError> {
            self.check_online()?;
            let name = partition.relation_name();
            if partition.kind() != PartitionKind::Traffic || !self.relations.contains(&name) {
                return Err(DashboardError::MissingPartition(name));
            }
            Ok(self
                .traffic
                .get(&name)
                .map(|rows| {
                    rows.iter()
                        .filter(|row| row.mall == mall)
                        .map(|row| row.visitors)
                        .sum()
                })
                .unwrap_or(0))
        }

        async fn distinct_zones(
            &self,
            partition: &Partition,
        ) -> Result<Vec<String>, DashboardError> {
            let zones: BTreeSet<&str> = self
                .feedback_rows(partition)?
                .iter()
                .map(|row| row.zone.as_str())
                .filter(|zone| !zone.is_empty())
                .collect();
            Ok(zones.into_iter().map(str::to_string).collect())
        }
    }
}
