use super::{Condition, ConditionKind, TopN};
use crate::{
    precision::{Precision, ReadFunction},
    wildcard::WILDCARD,
};

/// Collects every optional condition field; `build` picks the variant.
///
/// Precedence: a top-n request wins, then transient metric names, otherwise the
/// default variant. Contradictory input is not an error.
#[derive(Debug, Clone, Default)]
pub struct ConditionBuilder {
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
    top_n: Option<u32>,
    bottom_n: bool,
    top_n_function: Option<ReadFunction>,
    transient_metric_names: Vec<String>,
}

impl ConditionBuilder {
    pub fn metric_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metric_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn hostnames<I, S>(mut self, hostnames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hostnames = Some(hostnames.into_iter().map(Into::into).collect());
        self
    }

    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    pub fn instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }

    /// Epoch seconds or milliseconds.
    pub fn start_time(mut self, start_time: i64) -> Self {
        self.start_time = Some(start_time);
        self
    }

    pub fn end_time(mut self, end_time: i64) -> Self {
        self.end_time = Some(end_time);
        self
    }

    pub fn precision(mut self, precision: Precision) -> Self {
        self.precision = Some(precision);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn no_limit(mut self) -> Self {
        self.no_limit = true;
        self
    }

    pub fn fetch_size(mut self, fetch_size: i32) -> Self {
        self.fetch_size = Some(fetch_size);
        self
    }

    pub fn grouped(mut self, grouped: bool) -> Self {
        self.grouped = grouped;
        self
    }

    /// Adds an ORDER BY column; repeats are ignored and first-seen order is kept.
    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        let column = column.into();
        if !self.order_by_columns.contains(&column) {
            self.order_by_columns.push(column);
        }
        self
    }

    pub fn uuids<I>(mut self, uuids: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        self.uuids = uuids.into_iter().collect();
        self
    }

    pub fn metric_names_not(mut self, negate: bool) -> Self {
        self.metric_names_not = negate;
        self
    }

    pub fn hostnames_not(mut self, negate: bool) -> Self {
        self.hostnames_not = negate;
        self
    }

    pub fn uuid_not(mut self, negate: bool) -> Self {
        self.uuid_not = negate;
        self
    }

    /// Replaces the generated `SELECT ... FROM ...` head of the statement.
    pub fn statement(mut self, statement: impl Into<String>) -> Self {
        self.statement = Some(statement.into());
        self
    }

    pub fn top_n(mut self, top_n: u32) -> Self {
        self.top_n = Some(top_n);
        self
    }

    pub fn bottom_n(mut self, bottom_n: bool) -> Self {
        self.bottom_n = bottom_n;
        self
    }

    pub fn top_n_function(mut self, function: ReadFunction) -> Self {
        self.top_n_function = Some(function);
        self
    }

    pub fn transient_metric_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.transient_metric_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Condition {
        let kind = if let Some(top_n) = self.top_n {
            ConditionKind::TopN(TopN {
                top_n,
                bottom_n: self.bottom_n,
                function: self.top_n_function,
            })
        } else if !self.transient_metric_names.is_empty() {
            ConditionKind::Transient {
                metric_names: self.transient_metric_names,
            }
        } else {
            ConditionKind::Default
        };

        let hostnames = match (&kind, self.hostnames) {
            (ConditionKind::Transient { .. }, None) => Some(vec![WILDCARD.to_string()]),
            (ConditionKind::Transient { .. }, Some(hosts)) if hosts.is_empty() => {
                Some(vec![WILDCARD.to_string()])
            }
            (_, hosts) => hosts,
        };

        Condition {
            metric_names: self.metric_names,
            hostnames,
            app_id: self.app_id,
            instance_id: self.instance_id,
            start_time: self.start_time,
            end_time: self.end_time,
            precision: self.precision,
            limit: self.limit,
            no_limit: self.no_limit,
            fetch_size: self.fetch_size,
            grouped: self.grouped,
            order_by_columns: self.order_by_columns,
            uuids: self.uuids,
            metric_names_not: self.metric_names_not,
            hostnames_not: self.hostnames_not,
            uuid_not: self.uuid_not,
            statement: self.statement,
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::MetadataTarget;

    #[test]
    fn top_n_takes_precedence_over_transient_names() {
        let condition = Condition::builder()
            .metric_names(["mem_used"])
            .transient_metric_names(["transient.metric"])
            .top_n(5)
            .bottom_n(true)
            .top_n_function(ReadFunction::Sum)
            .build();

        let top_n = condition.top_n().expect("top-n variant");
        assert_eq!(top_n.top_n, 5);
        assert!(top_n.bottom_n);
        assert_eq!(top_n.function, Some(ReadFunction::Sum));
        assert_eq!(condition.metric_names(), ["mem_used"]);
    }

    #[test]
    fn transient_names_select_transient_variant_and_default_hosts() {
        let condition = Condition::builder()
            .transient_metric_names(["dfs.transient"])
            .build();

        assert!(condition.is_transient());
        assert_eq!(condition.metric_names(), ["dfs.transient"]);
        assert_eq!(condition.hostnames(), Some(&["%".to_string()][..]));
    }

    #[test]
    fn no_special_fields_builds_default_variant() {
        let condition = Condition::builder()
            .metric_names(["cpu_user"])
            .hostnames(["h1"])
            .build();
        assert_eq!(condition.kind(), &ConditionKind::Default);
        assert_eq!(condition.metadata_target(), None::<MetadataTarget>);
        assert_eq!(condition.hostnames(), Some(&["h1".to_string()][..]));
    }

    #[test]
    fn order_by_keeps_insertion_order_without_duplicates() {
        let condition = Condition::builder()
            .order_by("SERVER_TIME")
            .order_by("UUID")
            .order_by("SERVER_TIME")
            .build();
        assert_eq!(condition.order_by_columns(), ["SERVER_TIME", "UUID"]);
    }
}
