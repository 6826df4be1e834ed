//! Row-budget estimation and automatic precision selection.

use crate::{
    catalog::TableCatalog,
    condition::Condition,
    config::PlannerConfig,
    error::{PlannerError, Result},
    precision::Precision,
};
use tracing::debug;

const MILLIS_PER_SECOND: i64 = 1000;
const MILLIS_PER_MINUTE: i64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;
const MILLIS_PER_DAY: i64 = 24 * MILLIS_PER_HOUR;

pub struct PrecisionPlanner<'a> {
    config: &'a PlannerConfig,
    catalog: &'a TableCatalog,
}

impl<'a> PrecisionPlanner<'a> {
    pub fn new(config: &'a PlannerConfig, catalog: &'a TableCatalog) -> Self {
        Self { config, catalog }
    }

    /// Rows one series yields over `range_millis` at the given granularity.
    pub fn rows_for_precision(&self, precision: Precision, range_millis: i64, with_hosts: bool) -> i64 {
        let range = range_millis.max(0);
        let intervals = &self.config.intervals;
        match precision {
            Precision::Days => range / MILLIS_PER_DAY,
            Precision::Hours => range / MILLIS_PER_HOUR,
            Precision::Minutes => {
                let interval_secs = if with_hosts {
                    intervals.host_minute_secs
                } else {
                    intervals.cluster_minute_secs
                };
                (range / MILLIS_PER_MINUTE) / (interval_secs / 60).max(1)
            }
            Precision::Seconds => {
                let interval_secs = if with_hosts {
                    intervals.host_second_secs
                } else {
                    intervals.cluster_second_secs
                };
                (range / MILLIS_PER_SECOND) / interval_secs.max(1)
            }
        }
    }

    pub fn estimate_rows(&self, condition: &Condition, precision: Precision) -> i64 {
        let range = condition.range_millis().unwrap_or(0);
        let per_series = self.rows_for_precision(precision, range, condition.has_hosts());
        let hosts = condition.host_count().max(1) as i64;
        per_series
            .saturating_mul(condition.metric_names().len() as i64)
            .saturating_mul(hosts)
    }

    /// Picks the precision to read. A pinned precision is returned as-is,
    /// switches the condition to unlimited rows and must still fit the budget.
    pub fn resolve_precision(&self, condition: &mut Condition, now_millis: i64) -> Result<Precision> {
        if let Some(precision) = condition.precision() {
            condition.set_no_limit();
            self.validate_row_budget(condition, precision)?;
            return Ok(precision);
        }
        Ok(self.best_precision(condition, now_millis))
    }

    /// Finest precision whose estimate fits the ceiling and whose table still
    /// retains the requested start; the daily table otherwise.
    pub fn best_precision(&self, condition: &Condition, now_millis: i64) -> Precision {
        let with_hosts = condition.has_hosts();
        for precision in Precision::ALL {
            let estimated = self.estimate_rows(condition, precision);
            if estimated > self.config.result_limit {
                continue;
            }
            if self.within_retention(condition, precision, with_hosts, now_millis) {
                debug!(%precision, estimated, "selected precision for condition");
                return precision;
            }
        }
        debug!("no precision fits row budget and retention, falling back to DAYS");
        Precision::Days
    }

    pub fn validate_row_budget(&self, condition: &Condition, precision: Precision) -> Result<()> {
        if condition.metric_names().is_empty() {
            return Ok(());
        }

        let estimated_rows = self.estimate_rows(condition, precision);
        if estimated_rows > self.config.result_limit {
            return Err(PlannerError::PrecisionLimitExceeded {
                metrics: condition.metric_names().len(),
                hosts: condition.host_count().max(1),
                precision,
                range_secs: condition.range_millis().unwrap_or(0) / MILLIS_PER_SECOND,
                estimated_rows,
                limit: self.config.result_limit,
            });
        }
        Ok(())
    }

    fn within_retention(
        &self,
        condition: &Condition,
        precision: Precision,
        with_hosts: bool,
        now_millis: i64,
    ) -> bool {
        let Some(start) = condition.start_time() else {
            return false;
        };
        let ttl_millis = self
            .catalog
            .retention_secs(precision, with_hosts)
            .saturating_mul(MILLIS_PER_SECOND);
        now_millis.saturating_sub(ttl_millis) <= start
    }
}
