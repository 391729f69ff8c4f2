use anyhow::Context;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::catalog::{Partition, PARTITION_PATTERN};
use crate::error::DashboardError;
use crate::models::CaptionGroup;
use crate::store::Store;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Postgres-backed [`Store`] reading the `v_<YYYY>_<MM>_<kind>` views.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn partition_relations(&self) -> Result<Vec<String>, DashboardError> {
        let rows = sqlx::query(
            r#"
            SELECT table_name::text AS table_name
            FROM information_schema.views
            WHERE table_schema = current_schema()
              AND table_name::text ~ $1
            "#,
        )
        .bind(PARTITION_PATTERN)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("table_name").map_err(Into::into))
            .collect()
    }

    async fn caption_groups(
        &self,
        partition: &Partition,
        mall: &str,
        limit: i64,
    ) -> Result<Vec<CaptionGroup>, DashboardError> {
        let query = format!(
            "SELECT caption, COUNT(*) AS feedback_count, AVG(rating)::float8 AS avg_rating \
             FROM {} \
             WHERE zone = $1 AND caption IS NOT NULL AND caption <> '' \
             GROUP BY caption, zone \
             ORDER BY feedback_count DESC, avg_rating ASC NULLS FIRST \
             LIMIT $2",
            partition.quoted()
        );

        let rows = sqlx::query(&query)
            .bind(mall)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| DashboardError::from_store(&partition.relation_name(), err))?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in rows {
            groups.push(CaptionGroup {
                caption: row.try_get("caption")?,
                feedback_count: row.try_get("feedback_count")?,
                avg_rating: row.try_get("avg_rating")?,
            });
        }

        Ok(groups)
    }

    async fn feedback_total(
        &self,
        partition: &Partition,
        mall: &str,
    ) -> Result<i64, DashboardError> {
        let query = format!(
            "SELECT COUNT(*) AS total_feedback FROM {} WHERE zone = $1",
            partition.quoted()
        );

        let row = sqlx::query(&query)
            .bind(mall)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| DashboardError::from_store(&partition.relation_name(), err))?;

        Ok(row.try_get("total_feedback")?)
    }

    async fn visitor_sum(&self, partition: &Partition, mall: &str) -> Result<i64, DashboardError> {
        let query = format!(
            "SELECT COALESCE(SUM(total_visitors), 0)::bigint AS visitors FROM {} WHERE mall = $1",
            partition.quoted()
        );

        let row = sqlx::query(&query)
            .bind(mall)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| DashboardError::from_store(&partition.relation_name(), err))?;

        Ok(row.try_get("visitors")?)
    }

    async fn distinct_zones(&self, partition: &Partition) -> Result<Vec<String>, DashboardError> {
        let query = format!(
            "SELECT DISTINCT zone::text AS zone FROM {} \
             WHERE zone IS NOT NULL AND zone <> '' \
             ORDER BY zone",
            partition.quoted()
        );

        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| DashboardError::from_store(&partition.relation_name(), err))?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("zone").map_err(Into::into))
            .collect()
    }
}

const SEED_MALLS: [&str; 2] = ["Zone-A", "Zone-B"];

const SEED_CAPTIONS: [(&str, f64); 5] = [
    ("Clean restrooms", 4.5),
    ("Slow service", 3.0),
    ("Friendly staff", 5.0),
    ("Parking", 2.5),
    ("Lighting", 3.5),
];

fn month_bounds(year: i32, month: u32) -> anyhow::Result<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1).context("invalid month start")?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .context("invalid month end")?;
    Ok((start, end))
}

/// Load demo rows for `year` and expose them through the monthly views.
///
/// Feedback views cover January to March, traffic views January and
/// February, so later months exercise the absent-partition path.
pub async fn seed(pool: &PgPool, year: i32) -> anyhow::Result<()> {
    for month in 1..=3u32 {
        let (start, _) = month_bounds(year, month)?;

        for (mall_index, mall) in SEED_MALLS.iter().enumerate() {
            for (caption_index, (caption, rating)) in SEED_CAPTIONS.iter().enumerate() {
                let copies = (SEED_CAPTIONS.len() - caption_index + mall_index + month as usize) % 6 + 1;
                for copy in 0..copies {
                    let submitted_on = start
                        .with_day((copy as u32 % 28) + 1)
                        .context("invalid submission day")?;
                    let source_key =
                        format!("seed-{year}-{month:02}-{mall}-{caption_index}-{copy}");

                    sqlx::query(
                        r#"
                        INSERT INTO mall_dashboard.feedback_entries
                        (id, zone, caption, rating, submitted_on, source_key)
                        VALUES ($1, $2, $3, $4::numeric, $5, $6)
                        ON CONFLICT (source_key) DO NOTHING
                        "#,
                    )
                    .bind(Uuid::new_v4())
                    .bind(*mall)
                    .bind(*caption)
                    .bind(*rating)
                    .bind(submitted_on)
                    .bind(source_key)
                    .execute(pool)
                    .await?;
                }
            }

            sqlx::query(
                r#"
                INSERT INTO mall_dashboard.feedback_entries
                (id, zone, caption, rating, submitted_on, source_key)
                VALUES ($1, $2, NULL, NULL, $3, $4)
                ON CONFLICT (source_key) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(*mall)
            .bind(start)
            .bind(format!("seed-{year}-{month:02}-{mall}-uncaptioned"))
            .execute(pool)
            .await?;
        }

        create_reports_view(pool, year, month).await?;
    }

    for month in 1..=2u32 {
        let (start, _) = month_bounds(year, month)?;

        for (mall_index, mall) in SEED_MALLS.iter().enumerate() {
            let visitors = 1_000 * (mall_index as i32 + 1) + 150 * month as i32;
            sqlx::query(
                r#"
                INSERT INTO mall_dashboard.traffic_counts
                (id, mall, counted_on, total_visitors, source_key)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (source_key) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(*mall)
            .bind(start)
            .bind(visitors)
            .bind(format!("seed-{year}-{month:02}-{mall}-traffic"))
            .execute(pool)
            .await?;
        }

        create_traffic_view(pool, year, month).await?;
    }

    Ok(())
}

async fn create_reports_view(pool: &PgPool, year: i32, month: u32) -> anyhow::Result<()> {
    let partition = Partition::reports(year, month)?;
    let (start, end) = month_bounds(year, month)?;
    let ddl = format!(
        "CREATE OR REPLACE VIEW {} AS \
         SELECT caption, zone, rating FROM mall_dashboard.feedback_entries \
         WHERE submitted_on >= DATE '{start}' AND submitted_on < DATE '{end}'",
        partition.quoted()
    );
    sqlx::query(&ddl)
        .execute(pool)
        .await
        .with_context(|| format!("failed to create view {partition}"))?;
    tracing::info!(view = %partition, "view ready");
    Ok(())
}

async fn create_traffic_view(pool: &PgPool, year: i32, month: u32) -> anyhow::Result<()> {
    let partition = Partition::traffic(year, month)?;
    let (start, end) = month_bounds(year, month)?;
    let ddl = format!(
        "CREATE OR REPLACE VIEW {} AS \
         SELECT mall, total_visitors FROM mall_dashboard.traffic_counts \
         WHERE counted_on >= DATE '{start}' AND counted_on < DATE '{end}'",
        partition.quoted()
    );
    sqlx::query(&ddl)
        .execute(pool)
        .await
        .with_context(|| format!("failed to create view {partition}"))?;
    tracing::info!(view = %partition, "view ready");
    Ok(())
}
