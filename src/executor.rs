use std::cmp::Ordering;
use std::sync::Arc;

use crate::catalog::Partition;
use crate::error::DashboardError;
use crate::models::{CaptionGroup, FeedbackRankingItem, ReportData};
use crate::store::Store;

pub const TOP_CAPTIONS: usize = 3;

/// Result of reading one partition that may legitimately not exist.
#[derive(Debug, Clone, PartialEq)]
pub enum PartitionOutcome<T> {
    Found(T),
    Absent,
}

impl<T: Default> PartitionOutcome<T> {
    pub fn unwrap_or_empty(self) -> T {
        match self {
            PartitionOutcome::Found(value) => value,
            PartitionOutcome::Absent => T::default(),
        }
    }
}

fn absorb_missing<T>(result: Result<T, DashboardError>) -> Result<PartitionOutcome<T>, DashboardError> {
    match result {
        Ok(value) => Ok(PartitionOutcome::Found(value)),
        Err(DashboardError::MissingPartition(relation)) => {
            tracing::debug!(%relation, "partition absent");
            Ok(PartitionOutcome::Absent)
        }
        Err(err) => Err(err),
    }
}

/// Most feedback first; equal counts put the lower rating first, unrated before rated.
fn ranking_order(a: &CaptionGroup, b: &CaptionGroup) -> Ordering {
    b.feedback_count.cmp(&a.feedback_count).then_with(|| {
        match (a.avg_rating, b.avg_rating) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        }
    })
}

pub fn rank_groups(mut groups: Vec<CaptionGroup>) -> Vec<FeedbackRankingItem> {
    groups.sort_by(ranking_order);
    groups
        .into_iter()
        .take(TOP_CAPTIONS)
        .enumerate()
        .map(|(index, group)| FeedbackRankingItem {
            rank: index + 1,
            caption: group.caption,
            feedback_count: group.feedback_count,
            avg_rating: group.avg_rating,
        })
        .collect()
}

#[derive(Clone)]
pub struct PartitionExecutor {
    store: Arc<dyn Store>,
}

impl PartitionExecutor {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Top captions and the unfiltered feedback total for one mall.
    pub async fn rank_top_captions(
        &self,
        partition: &Partition,
        mall: &str,
    ) -> Result<PartitionOutcome<ReportData>, DashboardError> {
        let result = async {
            let groups = self
                .store
                .caption_groups(partition, mall, TOP_CAPTIONS as i64)
                .await?;
            let total_feedback = self.store.feedback_total(partition, mall).await?;
            Ok::<_, DashboardError>(ReportData {
                items: rank_groups(groups),
                total_feedback,
            })
        }
        .await;

        absorb_missing(result)
    }

    /// Visitor total for one mall; an absent traffic partition counts as zero.
    pub async fn sum_visitors(&self, partition: &Partition, mall: &str) -> Result<i64, DashboardError> {
        let outcome = absorb_missing(self.store.visitor_sum(partition, mall).await)?;
        Ok(outcome.unwrap_or_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fake::MemoryStore;

    fn group(caption: &str, count: i64, rating: Option<f64>) -> CaptionGroup {
        CaptionGroup {
            caption: caption.to_string(),
            feedback_count: count,
            avg_rating: rating,
        }
    }

    #[test]
    fn ties_surface_the_lower_rating_first() {
        let ranked = rank_groups(vec![
            group("Clean restrooms", 10, Some(4.5)),
            group("Friendly staff", 7, Some(5.0)),
            group("Slow service", 10, Some(3.0)),
        ]);

        let summary: Vec<(usize, &str, i64, Option<f64>)> = ranked
            .iter()
            .map(|item| (item.rank, item.caption.as_str(), item.feedback_count, item.avg_rating))
            .collect();
        assert_eq!(
            summary,
            vec![
                (1, "Slow service", 10, Some(3.0)),
                (2, "Clean restrooms", 10, Some(4.5)),
                (3, "Friendly staff", 7, Some(5.0)),
            ]
        );
    }

    #[test]
    fn ranking_keeps_three_and_orders_counts() {
        let ranked = rank_groups(vec![
            group("a", 1, Some(1.0)),
            group("b", 9, None),
            group("c", 9, Some(4.0)),
            group("d", 5, Some(2.0)),
            group("e", 2, Some(3.0)),
        ]);

        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].caption, "b");
        assert_eq!(ranked[1].caption, "c");
        assert_eq!(ranked[2].caption, "d");
        assert!(ranked
            .windows(2)
            .all(|pair| pair[0].feedback_count >= pair[1].feedback_count));
    }

    #[test]
    fn unrated_captions_rank_as_lowest_rated_on_ties() {
        let ranked = rank_groups(vec![
            group("rated", 5, Some(1.0)),
            group("unrated", 5, None),
            group("busier", 6, Some(4.0)),
        ]);

        let order: Vec<&str> = ranked.iter().map(|item| item.caption.as_str()).collect();
        assert_eq!(order, vec!["busier", "unrated", "rated"]);
        assert_eq!(ranked[1].avg_rating, None);
    }

    #[tokio::test]
    async fn totals_count_every_row_for_the_mall() {
        let store = MemoryStore::new()
            .with_feedback_n(2024, 3, "Zone-A", "Clean restrooms", 4.5, 10)
            .with_feedback_n(2024, 3, "Zone-A", "Slow service", 3.0, 10)
            .with_feedback_n(2024, 3, "Zone-A", "Friendly staff", 5.0, 7)
            .with_feedback_n(2024, 3, "Zone-A", "Parking", 2.0, 2)
            .with_feedback(2024, 3, "Zone-A", None, Some(1.0))
            .with_feedback(2024, 3, "Zone-A", Some(""), Some(1.0))
            .with_feedback_n(2024, 3, "Zone-B", "Slow service", 1.0, 40);
        let executor = PartitionExecutor::new(Arc::new(store));

        let partition = Partition::reports(2024, 3).unwrap();
        let PartitionOutcome::Found(data) = executor.rank_top_captions(&partition, "Zone-A").await.unwrap() else {
            panic!("partition should exist");
        };

        let captions: Vec<&str> = data.items.iter().map(|item| item.caption.as_str()).collect();
        assert_eq!(captions, vec!["Slow service", "Clean restrooms", "Friendly staff"]);
        assert_eq!(data.total_feedback, 31);
    }

    #[tokio::test]
    async fn missing_feedback_partition_is_absent() {
        let executor = PartitionExecutor::new(Arc::new(MemoryStore::new()));
        let partition = Partition::reports(2024, 5).unwrap();

        let outcome = executor.rank_top_captions(&partition, "Zone-A").await.unwrap();
        assert_eq!(outcome, PartitionOutcome::Absent);
        assert_eq!(outcome.unwrap_or_empty(), ReportData::default());
    }

    #[tokio::test]
    async fn visitors_sum_per_mall_and_default_to_zero() {
        let store = MemoryStore::new()
            .with_traffic(2024, 1, "Zone-A", 120)
            .with_traffic(2024, 1, "Zone-A", 80)
            .with_traffic(2024, 1, "Zone-B", 999);
        let executor = PartitionExecutor::new(Arc::new(store));

        let january = Partition::traffic(2024, 1).unwrap();
        let february = Partition::traffic(2024, 2).unwrap();
        assert_eq!(executor.sum_visitors(&january, "Zone-A").await.unwrap(), 200);
        assert_eq!(executor.sum_visitors(&january, "Zone-C").await.unwrap(), 0);
        assert_eq!(executor.sum_visitors(&february, "Zone-A").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn store_failures_propagate() {
        let executor = PartitionExecutor::new(Arc::new(MemoryStore::new().offline()));
        let partition = Partition::traffic(2024, 1).unwrap();

        let err = executor.sum_visitors(&partition, "Zone-A").await.unwrap_err();
        assert!(matches!(err, DashboardError::StoreUnavailable(_)));
    }
}
