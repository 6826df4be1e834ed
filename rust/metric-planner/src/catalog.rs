//! Physical table names and their retention windows.

use crate::{config::RetentionConfig, precision::Precision};

pub const METRICS_RECORD_TABLE: &str = "METRIC_RECORD_UUID";
pub const METRICS_AGGREGATE_MINUTE_TABLE: &str = "METRIC_RECORD_MINUTE_UUID";
pub const METRICS_AGGREGATE_HOURLY_TABLE: &str = "METRIC_RECORD_HOURLY_UUID";
pub const METRICS_AGGREGATE_DAILY_TABLE: &str = "METRIC_RECORD_DAILY_UUID";
pub const METRICS_CLUSTER_AGGREGATE_TABLE: &str = "METRIC_AGGREGATE_UUID";
pub const METRICS_CLUSTER_AGGREGATE_MINUTE_TABLE: &str = "METRIC_AGGREGATE_MINUTE_UUID";
pub const METRICS_CLUSTER_AGGREGATE_HOURLY_TABLE: &str = "METRIC_AGGREGATE_HOURLY_UUID";
pub const METRICS_CLUSTER_AGGREGATE_DAILY_TABLE: &str = "METRIC_AGGREGATE_DAILY_UUID";
pub const METRIC_TRANSIENT_TABLE: &str = "METRIC_TRANSIENT";
pub const METRICS_METADATA_TABLE: &str = "METRICS_METADATA_UUID";
pub const HOST_METADATA_TABLE: &str = "HOSTED_APPS_METADATA_UUID";

/// Routes a precision to the table holding rows of that granularity.
///
/// No precision means raw data: the per-host record table when hosts are
/// involved, the cluster-wide second aggregate otherwise.
pub fn target_table(precision: Option<Precision>, with_hosts: bool) -> &'static str {
    match (precision.unwrap_or(Precision::Seconds), with_hosts) {
        (Precision::Seconds, true) => METRICS_RECORD_TABLE,
        (Precision::Minutes, true) => METRICS_AGGREGATE_MINUTE_TABLE,
        (Precision::Hours, true) => METRICS_AGGREGATE_HOURLY_TABLE,
        (Precision::Days, true) => METRICS_AGGREGATE_DAILY_TABLE,
        (Precision::Seconds, false) => METRICS_CLUSTER_AGGREGATE_TABLE,
        (Precision::Minutes, false) => METRICS_CLUSTER_AGGREGATE_MINUTE_TABLE,
        (Precision::Hours, false) => METRICS_CLUSTER_AGGREGATE_HOURLY_TABLE,
        (Precision::Days, false) => METRICS_CLUSTER_AGGREGATE_DAILY_TABLE,
    }
}

/// Read-only view of table retention, built once from configuration.
#[derive(Debug, Clone)]
pub struct TableCatalog {
    retention: RetentionConfig,
}

impl TableCatalog {
    pub fn new(retention: RetentionConfig) -> Self {
        Self { retention }
    }

    pub fn retention_secs(&self, precision: Precision, with_hosts: bool) -> i64 {
        let r = &self.retention;
        match (precision, with_hosts) {
            (Precision::Seconds, true) => r.host_raw_secs,
            (Precision::Minutes, true) => r.host_minute_secs,
            (Precision::Hours, true) => r.host_hour_secs,
            (Precision::Days, true) => r.host_day_secs,
            (Precision::Seconds, false) => r.cluster_second_secs,
            (Precision::Minutes, false) => r.cluster_minute_secs,
            (Precision::Hours, false) => r.cluster_hour_secs,
            (Precision::Days, false) => r.cluster_day_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlannerConfig;
    use std::collections::HashSet;

    #[test]
    fn every_precision_routes_to_a_distinct_table() {
        let mut seen = HashSet::new();
        for precision in Precision::ALL {
            assert!(seen.insert(target_table(Some(precision), true)));
            assert!(seen.insert(target_table(Some(precision), false)));
        }
        assert_eq!(seen.len(), 8);
    }

    #[test]
    fn missing_precision_routes_to_raw_tables() {
        assert_eq!(target_table(None, true), METRICS_RECORD_TABLE);
        assert_eq!(target_table(None, false), METRICS_CLUSTER_AGGREGATE_TABLE);
    }

    #[test]
    fn retention_grows_with_coarser_precision() {
        let catalog = TableCatalog::new(PlannerConfig::default().retention);
        for with_hosts in [true, false] {
            let ttls: Vec<_> = Precision::ALL
                .iter()
                .map(|p| catalog.retention_secs(*p, with_hosts))
                .collect();
            assert!(ttls.windows(2).all(|pair| pair[0] <= pair[1]), "{ttls:?}");
        }
        assert_eq!(catalog.retention_secs(Precision::Seconds, true), 86_400);
    }
}
