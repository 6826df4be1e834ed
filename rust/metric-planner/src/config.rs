use anyhow::{Context, Result};
use serde::Deserialize;

const DAY_SECS: i64 = 86_400;

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Ceiling on the estimated number of rows a query may return.
    pub result_limit: i64,
    /// LIMIT applied when the caller neither pinned a precision nor gave one.
    pub default_limit: i64,
    pub default_fetch_size: Option<i32>,
    /// Emit the sort-merge-join hint on latest-value queries.
    pub sort_merge_join: bool,
    pub intervals: AggregatorIntervals,
    pub retention: RetentionConfig,
}

/// Seconds between consecutive rows in each aggregate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorIntervals {
    pub host_second_secs: i64,
    pub cluster_second_secs: i64,
    pub host_minute_secs: i64,
    pub cluster_minute_secs: i64,
}

/// TTL in seconds for each physical table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionConfig {
    pub host_raw_secs: i64,
    pub host_minute_secs: i64,
    pub host_hour_secs: i64,
    pub host_day_secs: i64,
    pub cluster_second_secs: i64,
    pub cluster_minute_secs: i64,
    pub cluster_hour_secs: i64,
    pub cluster_day_secs: i64,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default = "default_result_limit")]
    metrics_result_limit: i64,
    #[serde(default)]
    metrics_default_limit: Option<i64>,
    #[serde(default)]
    metrics_fetch_size: Option<i32>,
    #[serde(default)]
    metrics_sort_merge_join: bool,
    #[serde(default = "default_host_second_interval")]
    metrics_host_second_interval: i64,
    #[serde(default = "default_cluster_second_interval")]
    metrics_cluster_second_interval: i64,
    #[serde(default = "default_minute_interval")]
    metrics_host_minute_interval: i64,
    #[serde(default = "default_minute_interval")]
    metrics_cluster_minute_interval: i64,
    #[serde(default = "default_host_raw_ttl")]
    metrics_host_raw_ttl: i64,
    #[serde(default = "default_week_ttl")]
    metrics_host_minute_ttl: i64,
    #[serde(default = "default_month_ttl")]
    metrics_host_hour_ttl: i64,
    #[serde(default = "default_year_ttl")]
    metrics_host_day_ttl: i64,
    #[serde(default = "default_week_ttl")]
    metrics_cluster_second_ttl: i64,
    #[serde(default = "default_month_ttl")]
    metrics_cluster_minute_ttl: i64,
    #[serde(default = "default_year_ttl")]
    metrics_cluster_hour_ttl: i64,
    #[serde(default = "default_two_year_ttl")]
    metrics_cluster_day_ttl: i64,
}

const fn default_result_limit() -> i64 {
    5760
}

const fn default_host_second_interval() -> i64 {
    60
}

const fn default_cluster_second_interval() -> i64 {
    30
}

const fn default_minute_interval() -> i64 {
    300
}

const fn default_host_raw_ttl() -> i64 {
    DAY_SECS
}

const fn default_week_ttl() -> i64 {
    7 * DAY_SECS
}

const fn default_month_ttl() -> i64 {
    30 * DAY_SECS
}

const fn default_year_ttl() -> i64 {
    365 * DAY_SECS
}

const fn default_two_year_ttl() -> i64 {
    730 * DAY_SECS
}

impl PlannerConfig {
    pub fn from_env() -> Result<Self> {
        let raw: RawConfig =
            envy::from_env().context("failed to parse METRICS_* environment variables")?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        if raw.metrics_result_limit < 1 {
            anyhow::bail!("METRICS_RESULT_LIMIT must be positive");
        }

        let intervals = AggregatorIntervals {
            host_second_secs: positive(raw.metrics_host_second_interval)
                .context("METRICS_HOST_SECOND_INTERVAL must be positive")?,
            cluster_second_secs: positive(raw.metrics_cluster_second_interval)
                .context("METRICS_CLUSTER_SECOND_INTERVAL must be positive")?,
            host_minute_secs: positive(raw.metrics_host_minute_interval)
                .context("METRICS_HOST_MINUTE_INTERVAL must be positive")?,
            cluster_minute_secs: positive(raw.metrics_cluster_minute_interval)
                .context("METRICS_CLUSTER_MINUTE_INTERVAL must be positive")?,
        };

        let retention = RetentionConfig {
            host_raw_secs: raw.metrics_host_raw_ttl,
            host_minute_secs: raw.metrics_host_minute_ttl,
            host_hour_secs: raw.metrics_host_hour_ttl,
            host_day_secs: raw.metrics_host_day_ttl,
            cluster_second_secs: raw.metrics_cluster_second_ttl,
            cluster_minute_secs: raw.metrics_cluster_minute_ttl,
            cluster_hour_secs: raw.metrics_cluster_hour_ttl,
            cluster_day_secs: raw.metrics_cluster_day_ttl,
        };

        Ok(Self {
            result_limit: raw.metrics_result_limit,
            default_limit: raw
                .metrics_default_limit
                .unwrap_or(raw.metrics_result_limit)
                .max(1),
            default_fetch_size: raw.metrics_fetch_size.filter(|size| *size > 0),
            sort_merge_join: raw.metrics_sort_merge_join,
            intervals,
            retention,
        })
    }

    /// Config for callers that embed the planner without an environment.
    pub fn embedded(result_limit: i64) -> Self {
        Self {
            result_limit,
            default_limit: result_limit,
            ..Self::default()
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            result_limit: default_result_limit(),
            default_limit: default_result_limit(),
            default_fetch_size: None,
            sort_merge_join: false,
            intervals: AggregatorIntervals {
                host_second_secs: default_host_second_interval(),
                cluster_second_secs: default_cluster_second_interval(),
                host_minute_secs: default_minute_interval(),
                cluster_minute_secs: default_minute_interval(),
            },
            retention: RetentionConfig {
                host_raw_secs: default_host_raw_ttl(),
                host_minute_secs: default_week_ttl(),
                host_hour_secs: default_month_ttl(),
                host_day_secs: default_year_ttl(),
                cluster_second_secs: default_week_ttl(),
                cluster_minute_secs: default_month_ttl(),
                cluster_hour_secs: default_year_ttl(),
                cluster_day_secs: default_two_year_ttl(),
            },
        }
    }
}

fn positive(value: i64) -> Option<i64> {
    (value > 0).then_some(value)
}
