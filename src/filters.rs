use std::sync::Arc;

use crate::catalog::PartitionCatalog;
use crate::error::DashboardError;
use crate::models::FilterSet;
use crate::store::Store;

#[derive(Clone)]
pub struct FilterService {
    catalog: PartitionCatalog,
}

impl FilterService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            catalog: PartitionCatalog::new(store),
        }
    }

    pub async fn compute_filters(&self) -> Result<FilterSet, DashboardError> {
        let years = self.catalog.discover_years().await?;
        let Some(&default_year) = years.last() else {
            return Ok(FilterSet::default());
        };

        let malls = match self.catalog.malls_for_year(default_year).await {
            Ok(malls) => malls,
            Err(DashboardError::MissingPartition(relation)) => {
                tracing::debug!(%relation, "no January partition for default year");
                Vec::new()
            }
            Err(err) => return Err(err),
        };
        let default_mall = malls.first().cloned();

        Ok(FilterSet {
            years,
            malls,
            default_year: Some(default_year),
            default_mall,
        })
    }
}
