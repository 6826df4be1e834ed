//! Typed description of a metric query: what to read, for whom, over which window.

mod builder;
mod split;

pub use builder::ConditionBuilder;
pub use split::{MetricSplit, SplitByMetricNames};

use crate::{
    error::{PlannerError, Result},
    precision::{Precision, ReadFunction},
    wildcard,
};
use serde::Serialize;
use std::borrow::Cow;

/// Epoch values below this are read as seconds. Ambiguous past ~2286; kept as-is
/// because stored callers rely on it.
const SECONDS_THRESHOLD: i64 = 9_999_999_999;

const RESERVED_APP_IDS: [&str; 2] = ["HOST", "FLUME_HANDLER"];

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    metric_names: Vec<String>,
    hostnames: Option<Vec<String>>,
    app_id: Option<String>,
    instance_id: Option<String>,
    start_time: Option<i64>,
    end_time: Option<i64>,
    precision: Option<Precision>,
    limit: Option<i64>,
    no_limit: bool,
    fetch_size: Option<i32>,
    grouped: bool,
    order_by_columns: Vec<String>,
    uuids: Vec<Vec<u8>>,
    metric_names_not: bool,
    hostnames_not: bool,
    uuid_not: bool,
    statement: Option<String>,
    kind: ConditionKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConditionKind {
    Default,
    TopN(TopN),
    /// Transient metric names replace the shared metric list for this variant.
    Transient { metric_names: Vec<String> },
    Metadata(MetadataTarget),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopN {
    pub top_n: u32,
    pub bottom_n: bool,
    pub function: Option<ReadFunction>,
}

impl TopN {
    /// Aggregate expression the inner ranking query orders by.
    pub fn rank_expr(&self) -> &'static str {
        match self.function {
            Some(ReadFunction::Avg) => "ROUND(AVG(METRIC_SUM),2)",
            Some(ReadFunction::Sum) => "SUM(METRIC_SUM)",
            _ => "MAX(METRIC_MAX)",
        }
    }

    pub fn direction(&self) -> &'static str {
        if self.bottom_n {
            "ASC"
        } else {
            "DESC"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataTarget {
    Metric,
    Host,
}

impl Condition {
    pub fn builder() -> ConditionBuilder {
        ConditionBuilder::default()
    }

    /// Scan of metric metadata filtered by name, app and instance.
    pub fn metric_metadata<I, S>(
        metric_names: I,
        app_id: Option<String>,
        instance_id: Option<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut condition = Self::blank(ConditionKind::Metadata(MetadataTarget::Metric));
        condition.metric_names = metric_names.into_iter().map(Into::into).collect();
        condition.app_id = app_id;
        condition.instance_id = instance_id;
        condition
    }

    /// Scan of hosted-app metadata filtered by hostname.
    pub fn host_metadata<I, S>(hostnames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut condition = Self::blank(ConditionKind::Metadata(MetadataTarget::Host));
        let hostnames: Vec<String> = hostnames.into_iter().map(Into::into).collect();
        condition.hostnames = (!hostnames.is_empty()).then_some(hostnames);
        condition
    }

    pub(crate) fn blank(kind: ConditionKind) -> Self {
        Self {
            metric_names: Vec::new(),
            hostnames: None,
            app_id: None,
            instance_id: None,
            start_time: None,
            end_time: None,
            precision: None,
            limit: None,
            no_limit: false,
            fetch_size: None,
            grouped: false,
            order_by_columns: Vec::new(),
            uuids: Vec::new(),
            metric_names_not: false,
            hostnames_not: false,
            uuid_not: false,
            statement: None,
            kind,
        }
    }

    pub fn kind(&self) -> &ConditionKind {
        &self.kind
    }

    pub fn top_n(&self) -> Option<&TopN> {
        match &self.kind {
            ConditionKind::TopN(top_n) => Some(top_n),
            _ => None,
        }
    }

    pub fn metadata_target(&self) -> Option<MetadataTarget> {
        match self.kind {
            ConditionKind::Metadata(target) => Some(target),
            _ => None,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self.kind, ConditionKind::Transient { .. })
    }

    /// Metric names this condition filters on; the transient list for transient conditions.
    pub fn metric_names(&self) -> &[String] {
        match &self.kind {
            ConditionKind::Transient { metric_names } => metric_names,
            _ => &self.metric_names,
        }
    }

    pub(crate) fn set_metric_names(&mut self, names: Vec<String>) {
        match &mut self.kind {
            ConditionKind::Transient { metric_names } => *metric_names = names,
            _ => self.metric_names = names,
        }
    }

    pub fn hostnames(&self) -> Option<&[String]> {
        self.hostnames.as_deref()
    }

    pub fn has_hosts(&self) -> bool {
        self.hostnames.as_ref().is_some_and(|hosts| !hosts.is_empty())
    }

    pub fn host_count(&self) -> usize {
        self.hostnames.as_ref().map_or(0, Vec::len)
    }

    /// App id, lower-cased unless it is one of the reserved upper-case ids.
    pub fn app_id(&self) -> Option<Cow<'_, str>> {
        let app_id = self.app_id.as_deref().filter(|id| !id.is_empty())?;
        if RESERVED_APP_IDS.contains(&app_id) {
            Some(Cow::Borrowed(app_id))
        } else {
            Some(Cow::Owned(app_id.to_lowercase()))
        }
    }

    pub fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn start_time(&self) -> Option<i64> {
        self.start_time.map(to_millis)
    }

    pub fn end_time(&self) -> Option<i64> {
        self.end_time.map(to_millis)
    }

    /// Requested window in milliseconds, when both bounds are known.
    pub fn range_millis(&self) -> Option<i64> {
        Some(self.end_time()?.saturating_sub(self.start_time()?))
    }

    pub fn precision(&self) -> Option<Precision> {
        self.precision
    }

    /// Row cap to append as LIMIT, or `None` when the caller asked for every row.
    pub fn limit(&self, default_limit: i64) -> Option<i64> {
        if self.no_limit || self.precision.is_some() {
            None
        } else {
            Some(self.limit.unwrap_or(default_limit))
        }
    }

    pub fn is_no_limit(&self) -> bool {
        self.no_limit
    }

    pub(crate) fn set_no_limit(&mut self) {
        self.no_limit = true;
    }

    pub fn fetch_size(&self) -> Option<i32> {
        self.fetch_size
    }

    pub fn is_grouped(&self) -> bool {
        self.grouped
    }

    pub fn order_by_columns(&self) -> &[String] {
        &self.order_by_columns
    }

    pub fn uuids(&self) -> &[Vec<u8>] {
        &self.uuids
    }

    pub fn metric_names_not(&self) -> bool {
        self.metric_names_not
    }

    pub fn hostnames_not(&self) -> bool {
        self.hostnames_not
    }

    pub fn uuid_not(&self) -> bool {
        self.uuid_not
    }

    pub fn statement(&self) -> Option<&str> {
        self.statement.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.metric_names().is_empty()
            && !self.has_hosts()
            && self.app_id().is_none()
            && self.instance_id().is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
    }

    pub fn is_top_n_host_condition(&self) -> bool {
        is_top_n_host_condition(self.metric_names(), self.hostnames())
    }

    pub fn is_top_n_metric_condition(&self) -> bool {
        is_top_n_metric_condition(self.metric_names(), self.hostnames())
    }

    pub(crate) fn ensure_top_n_shape(&self) -> Result<()> {
        if self.is_top_n_host_condition() || self.is_top_n_metric_condition() {
            Ok(())
        } else {
            Err(PlannerError::InvalidTopNShape {
                metrics: self.metric_names().len(),
                hosts: self.host_count(),
            })
        }
    }
}

/// One metric (no pattern) ranked across one or more hosts.
pub fn is_top_n_host_condition(metric_names: &[String], hostnames: Option<&[String]>) -> bool {
    hostnames.is_some_and(|hosts| !hosts.is_empty())
        && metric_names.len() == 1
        && !wildcard::any_wildcard(metric_names)
}

/// One or more metrics (patterns allowed) ranked for at most one concrete host.
pub fn is_top_n_metric_condition(metric_names: &[String], hostnames: Option<&[String]>) -> bool {
    let hosts = hostnames.unwrap_or_default();
    !metric_names.is_empty() && hosts.len() <= 1 && !wildcard::any_wildcard(hosts)
}

fn to_millis(value: i64) -> i64 {
    if value < SECONDS_THRESHOLD {
        value.saturating_mul(1000)
    } else {
        value
    }
}
