//! Turns conditions into finished SQL text plus ordered binds, and replays
//! those binds onto a prepared statement.

use crate::{
    bind::BindValue,
    budget::PrecisionPlanner,
    catalog::{
        target_table, TableCatalog, HOST_METADATA_TABLE, METRICS_CLUSTER_AGGREGATE_TABLE,
        METRICS_METADATA_TABLE, METRICS_RECORD_TABLE, METRIC_TRANSIENT_TABLE,
    },
    clause::{self, Clause},
    condition::{Condition, ConditionKind, MetadataTarget, SplitByMetricNames},
    config::PlannerConfig,
    connection::{PreparedStatement, StatementConnection},
    error::{PlannerError, Result},
    precision::Precision,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

const METRIC_COLUMNS: &str =
    "UUID, SERVER_TIME, METRIC_SUM, METRIC_MAX, METRIC_MIN, METRIC_COUNT, METRICS";
const METRIC_AGGREGATE_ONLY_COLUMNS: &str =
    "UUID, SERVER_TIME, METRIC_SUM, METRIC_MAX, METRIC_MIN, METRIC_COUNT";
const CLUSTER_AGGREGATE_COLUMNS: &str =
    "UUID, SERVER_TIME, METRIC_SUM, HOSTS_COUNT, METRIC_MAX, METRIC_MIN";
const CLUSTER_AGGREGATE_TIME_COLUMNS: &str =
    "UUID, SERVER_TIME, METRIC_SUM, METRIC_COUNT, METRIC_MAX, METRIC_MIN";
const TRANSIENT_COLUMNS: &str = "METRIC_NAME, HOSTNAME, APP_ID, INSTANCE_ID, SERVER_TIME, UNITS, \
     METRIC_SUM, METRIC_MAX, METRIC_MIN, METRIC_COUNT, METRICS";
const METRIC_METADATA_COLUMNS: &str = "METRIC_NAME, APP_ID, INSTANCE_ID, UUID";
const HOST_METADATA_COLUMNS: &str = "HOSTNAME, UUID";
const LATEST_COLUMNS: &str = "E.UUID AS UUID, E.SERVER_TIME AS SERVER_TIME, \
     E.METRIC_SUM AS METRIC_SUM, E.METRIC_MAX AS METRIC_MAX, E.METRIC_MIN AS METRIC_MIN, \
     E.METRIC_COUNT AS METRIC_COUNT, E.METRICS AS METRICS";

pub const SORT_MERGE_JOIN_HINT: &str = "/*+ USE_SORT_MERGE_JOIN NO_CACHE */";

const DEFAULT_ORDER: &str = " ORDER BY UUID, SERVER_TIME";
const TRANSIENT_ORDER: &str = " ORDER BY METRIC_NAME, SERVER_TIME";
const LATEST_AGGREGATE_ORDER: &str = " ORDER BY UUID DESC, SERVER_TIME DESC";

/// Finished statement: SQL with `?` placeholders and one bind per placeholder.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedStatement {
    sql: String,
    binds: Vec<BindValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fetch_size: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    precision: Option<Precision>,
    table: &'static str,
    #[serde(skip)]
    condition: Condition,
}

impl PlannedStatement {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn binds(&self) -> &[BindValue] {
        &self.binds
    }

    pub fn fetch_size(&self) -> Option<i32> {
        self.fetch_size
    }

    /// Precision the statement reads at; `None` for tables with a single granularity.
    pub fn precision(&self) -> Option<Precision> {
        self.precision
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    /// Condition as planned: names re-ordered to bind order, `no_limit` applied.
    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn placeholder_count(&self) -> usize {
        self.sql.matches('?').count()
    }
}

#[derive(Clone)]
pub struct StatementPlanner {
    config: Arc<PlannerConfig>,
    catalog: Arc<TableCatalog>,
    clock: fn() -> DateTime<Utc>,
}

impl std::fmt::Debug for StatementPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatementPlanner")
            .field("config", &self.config)
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}

impl StatementPlanner {
    pub fn new(config: Arc<PlannerConfig>) -> Self {
        let catalog = Arc::new(TableCatalog::new(config.retention));
        Self::with_catalog(config, catalog)
    }

    pub fn with_catalog(config: Arc<PlannerConfig>, catalog: Arc<TableCatalog>) -> Self {
        Self {
            config,
            catalog,
            clock: Utc::now,
        }
    }

    /// Replaces the wall clock used for retention checks.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn catalog(&self) -> &TableCatalog {
        &self.catalog
    }

    /// Raw or aggregated per-host series.
    pub fn plan_get_metrics(&self, condition: &Condition) -> Result<PlannedStatement> {
        let mut condition = self.working_copy(condition)?;
        self.ensure_series_variant(&condition, "metric")?;

        let precision = self.resolve_precision(&mut condition)?;
        let table = target_table(Some(precision), true);
        let columns = if precision == Precision::Seconds {
            METRIC_COLUMNS
        } else {
            METRIC_AGGREGATE_ONLY_COLUMNS
        };

        let head = self.head(&condition, columns, table);
        let clause = clause::render(&mut condition, Some(precision));
        let order = order_by(&condition, false).unwrap_or_else(|| DEFAULT_ORDER.to_string());
        let limit = condition.limit(self.config.default_limit);
        Ok(self.finish(head, clause, order, limit, Some(precision), table, condition))
    }

    /// Cluster-wide aggregates.
    pub fn plan_get_aggregates(&self, condition: &Condition) -> Result<PlannedStatement> {
        let mut condition = self.working_copy(condition)?;
        self.ensure_series_variant(&condition, "aggregate")?;

        let precision = self.resolve_precision(&mut condition)?;
        let table = target_table(Some(precision), false);
        let columns = if precision == Precision::Seconds {
            CLUSTER_AGGREGATE_COLUMNS
        } else {
            CLUSTER_AGGREGATE_TIME_COLUMNS
        };

        let head = self.head(&condition, columns, table);
        let clause = clause::render(&mut condition, Some(precision));
        let order = order_by(&condition, false).unwrap_or_else(|| DEFAULT_ORDER.to_string());
        let limit = condition.limit(self.config.default_limit);
        Ok(self.finish(head, clause, order, limit, Some(precision), table, condition))
    }

    /// Most recent raw row for each matching series.
    pub fn plan_get_latest(&self, condition: &Condition) -> Result<PlannedStatement> {
        let mut condition = self.working_copy(condition)?;
        if !matches!(condition.kind(), ConditionKind::Default) {
            return Err(PlannerError::InvalidRequest(
                "latest metric queries take a plain condition".into(),
            ));
        }
        if condition.metric_names().is_empty() {
            return Err(PlannerError::InvalidRequest(
                "latest metric queries require metric names".into(),
            ));
        }

        let table = METRICS_RECORD_TABLE;
        let (filter, binds) = clause::default_clause(&mut condition).into_parts();
        let hint = if self.config.sort_merge_join {
            format!("{SORT_MERGE_JOIN_HINT} ")
        } else {
            String::new()
        };
        let filter = if filter.is_empty() {
            filter
        } else {
            format!(" WHERE {filter}")
        };

        let sql = match condition.statement() {
            // A caller statement is the whole query; binds still follow the filter.
            Some(statement) => statement.to_string(),
            None => {
                let mut sql = format!(
                    "SELECT {hint}{LATEST_COLUMNS} FROM {table} AS E INNER JOIN \
                     (SELECT UUID, MAX(SERVER_TIME) AS MAX_SERVER_TIME FROM {table}{filter} GROUP BY UUID) AS I \
                     ON E.UUID=I.UUID AND E.SERVER_TIME=I.MAX_SERVER_TIME"
                );
                if let Some(order) = order_by(&condition, true) {
                    sql.push_str(&order);
                }
                sql
            }
        };

        Ok(self.planned(sql, binds, None, table, condition))
    }

    pub fn plan_transient_metrics(&self, condition: &Condition) -> Result<PlannedStatement> {
        let mut condition = self.working_copy(condition)?;
        if !condition.is_transient() {
            return Err(PlannerError::InvalidRequest(
                "transient metric queries require transient metric names".into(),
            ));
        }
        if let Some(precision) = condition.precision() {
            PrecisionPlanner::new(&self.config, &self.catalog)
                .validate_row_budget(&condition, precision)?;
        }

        let table = METRIC_TRANSIENT_TABLE;
        let head = self.head(&condition, TRANSIENT_COLUMNS, table);
        let clause = clause::transient_clause(&mut condition);
        let order = order_by(&condition, false).unwrap_or_else(|| TRANSIENT_ORDER.to_string());
        let limit = condition.limit(self.config.default_limit);
        Ok(self.finish(head, clause, order, limit, None, table, condition))
    }

    /// Metadata scans may be unfiltered, so an empty condition is allowed here.
    pub fn plan_metadata_scan(&self, condition: &Condition) -> Result<PlannedStatement> {
        let Some(target) = condition.metadata_target() else {
            return Err(PlannerError::InvalidRequest(
                "metadata scans require a metadata condition".into(),
            ));
        };
        let mut condition = condition.clone();

        let (table, columns) = match target {
            MetadataTarget::Metric => (METRICS_METADATA_TABLE, METRIC_METADATA_COLUMNS),
            MetadataTarget::Host => (HOST_METADATA_TABLE, HOST_METADATA_COLUMNS),
        };
        let head = self.head(&condition, columns, table);
        let clause = clause::metadata_clause(&mut condition, target);
        Ok(self.finish(head, clause, String::new(), None, None, table, condition))
    }

    /// One statement per resolved identity, each reading that identity's latest
    /// cluster aggregates.
    pub fn plan_latest_aggregates(
        &self,
        split: &SplitByMetricNames,
    ) -> Result<Vec<PlannedStatement>> {
        let condition = self.working_copy(split.condition())?;
        if split.is_empty() {
            return Err(PlannerError::InvalidRequest(
                "latest aggregate queries require resolved identities".into(),
            ));
        }

        let table = METRICS_CLUSTER_AGGREGATE_TABLE;
        let limit = condition.metric_names().len().max(1) as i64;
        let statements = split
            .iter()
            .map(|metric| {
                let head = format!("SELECT {CLUSTER_AGGREGATE_COLUMNS} FROM {table}");
                let clause = clause::split_clause(&condition, metric.current_uuid());
                self.finish(
                    head,
                    clause,
                    LATEST_AGGREGATE_ORDER.to_string(),
                    Some(limit),
                    None,
                    table,
                    condition.clone(),
                )
            })
            .collect();
        Ok(statements)
    }

    fn working_copy(&self, condition: &Condition) -> Result<Condition> {
        if condition.is_empty() {
            return Err(PlannerError::EmptyCondition);
        }
        Ok(condition.clone())
    }

    fn ensure_series_variant(&self, condition: &Condition, label: &str) -> Result<()> {
        match condition.kind() {
            ConditionKind::Default => Ok(()),
            ConditionKind::TopN(_) => condition.ensure_top_n_shape().map_err(|err| {
                warn!(
                    metrics = condition.metric_names().len(),
                    hosts = condition.host_count(),
                    "rejecting top-n condition"
                );
                err
            }),
            _ => Err(PlannerError::InvalidRequest(format!(
                "{label} queries take a plain or top-n condition"
            ))),
        }
    }

    fn resolve_precision(&self, condition: &mut Condition) -> Result<Precision> {
        let now = (self.clock)().timestamp_millis();
        PrecisionPlanner::new(&self.config, &self.catalog).resolve_precision(condition, now)
    }

    fn head(&self, condition: &Condition, columns: &str, table: &str) -> String {
        match condition.statement() {
            Some(statement) => statement.to_string(),
            None => format!("SELECT {columns} FROM {table}"),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        head: String,
        clause: Clause,
        order: String,
        limit: Option<i64>,
        precision: Option<Precision>,
        table: &'static str,
        condition: Condition,
    ) -> PlannedStatement {
        let (filter, binds) = clause.into_parts();
        let mut sql = head;
        if !filter.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&filter);
        }
        sql.push_str(&order);
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        self.planned(sql, binds, precision, table, condition)
    }

    fn planned(
        &self,
        sql: String,
        binds: Vec<BindValue>,
        precision: Option<Precision>,
        table: &'static str,
        condition: Condition,
    ) -> PlannedStatement {
        let fetch_size = condition.fetch_size().or(self.config.default_fetch_size);
        debug!(%sql, binds = binds.len(), table, "planned metric statement");
        PlannedStatement {
            sql,
            binds,
            fetch_size,
            precision,
            table,
            condition,
        }
    }
}

/// Explicit ORDER BY columns, each suffixed with DESC for descending plans.
fn order_by(condition: &Condition, descending: bool) -> Option<String> {
    let columns = condition.order_by_columns();
    if columns.is_empty() {
        return None;
    }
    let suffix = if descending { " DESC" } else { "" };
    let rendered: Vec<String> = columns
        .iter()
        .map(|column| format!("{column}{suffix}"))
        .collect();
    Some(format!(" ORDER BY {}", rendered.join(", ")))
}

/// Prepares `plan` on `conn` and binds every value at its 1-based position.
///
/// A failed bind closes the statement before the connection's error is returned.
pub fn prepare_statement<C>(
    conn: &mut C,
    plan: &PlannedStatement,
) -> std::result::Result<C::Statement, C::Error>
where
    C: StatementConnection,
{
    let mut statement = conn.prepare(plan.sql())?;
    if let Err(err) = bind_all(&mut statement, plan) {
        statement.close();
        return Err(err);
    }
    Ok(statement)
}

fn bind_all<S: PreparedStatement>(
    statement: &mut S,
    plan: &PlannedStatement,
) -> std::result::Result<(), S::Error> {
    for (index, value) in plan.binds().iter().enumerate() {
        let position = index + 1;
        debug!(position, ?value, "binding statement parameter");
        match value {
            BindValue::Bytes(bytes) => statement.bind_bytes(position, bytes)?,
            BindValue::Text(text) => statement.bind_text(position, text)?,
            BindValue::BigInt(number) => statement.bind_i64(position, *number)?,
        }
    }
    if let Some(rows) = plan.fetch_size() {
        statement.set_fetch_size(rows)?;
    }
    Ok(())
}
