//! WHERE-clause rendering. Every `?` is pushed together with its bind value, so
//! the bind list is always in placeholder order.

use crate::{
    bind::BindValue,
    catalog::target_table,
    condition::{Condition, MetadataTarget, TopN},
    precision::Precision,
    wildcard,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clause {
    sql: String,
    binds: Vec<BindValue>,
}

impl Clause {
    pub fn new(sql: impl Into<String>, binds: Vec<BindValue>) -> Self {
        Self {
            sql: sql.into(),
            binds,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn binds(&self) -> &[BindValue] {
        &self.binds
    }

    pub fn into_parts(self) -> (String, Vec<BindValue>) {
        (self.sql, self.binds)
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    pub fn placeholder_count(&self) -> usize {
        self.sql.matches('?').count()
    }

    /// Conjoins `other`, emitting `AND` only when both sides rendered something.
    pub fn and(mut self, other: Clause) -> Self {
        self.push_and(other);
        self
    }

    fn push_and(&mut self, other: Clause) {
        if other.is_empty() {
            return;
        }
        if !self.sql.is_empty() {
            self.sql.push_str(" AND ");
        }
        self.sql.push_str(&other.sql);
        self.binds.extend(other.binds);
    }
}

/// Renders the predicate for any condition variant.
///
/// Metric names on `condition` are re-ordered exact-then-pattern when the name
/// filter renders. `precision` routes the top-n ranking sub-query.
pub fn render(condition: &mut Condition, precision: Option<Precision>) -> Clause {
    if let Some(top_n) = condition.top_n().copied() {
        return top_n_clause(condition, &top_n, precision);
    }
    if let Some(target) = condition.metadata_target() {
        return metadata_clause(condition, target);
    }
    if condition.is_transient() {
        return transient_clause(condition);
    }
    default_clause(condition)
}

/// Identity or name/host/app/instance filters, then the time window.
pub fn default_clause(condition: &mut Condition) -> Clause {
    filter_clause(condition).and(time_clause(condition))
}

pub fn top_n_clause(condition: &mut Condition, top_n: &TopN, precision: Option<Precision>) -> Clause {
    let table = target_table(precision, condition.has_hosts());
    let (inner_sql, inner_binds) = default_clause(condition).into_parts();
    let filter = if inner_sql.is_empty() {
        String::new()
    } else {
        format!(" WHERE {inner_sql}")
    };

    let ranked = format!(
        "UUID IN (SELECT UUID FROM {table}{filter} GROUP BY UUID ORDER BY {} {} LIMIT {})",
        top_n.rank_expr(),
        top_n.direction(),
        top_n.top_n,
    );
    Clause::new(ranked, inner_binds).and(time_clause(condition))
}

pub fn transient_clause(condition: &mut Condition) -> Clause {
    metric_name_clause(condition)
        .and(host_clause(condition))
        .and(app_clause(condition))
        .and(instance_clause(condition))
        .and(time_clause(condition))
}

pub fn metadata_clause(condition: &mut Condition, target: MetadataTarget) -> Clause {
    match target {
        MetadataTarget::Metric => metric_name_clause(condition)
            .and(app_clause(condition))
            .and(instance_clause(condition)),
        MetadataTarget::Host => host_clause(condition),
    }
}

/// Predicate for a single identity of a split condition.
pub fn split_clause(condition: &Condition, uuid: &[u8]) -> Clause {
    Clause::new("UUID = ?", vec![BindValue::from(uuid)]).and(time_clause(condition))
}

fn filter_clause(condition: &mut Condition) -> Clause {
    if !condition.uuids().is_empty() {
        return uuid_clause(condition);
    }
    metric_name_clause(condition)
        .and(host_clause(condition))
        .and(app_clause(condition))
        .and(instance_clause(condition))
}

pub fn uuid_clause(condition: &Condition) -> Clause {
    let uuids = condition.uuids();
    if uuids.is_empty() {
        return Clause::default();
    }
    let sql = format!(
        "(UUID {}IN ({}))",
        not(condition.uuid_not()),
        placeholders(uuids.len())
    );
    let binds = uuids.iter().map(|uuid| BindValue::Bytes(uuid.clone())).collect();
    Clause::new(sql, binds)
}

pub fn metric_name_clause(condition: &mut Condition) -> Clause {
    let (exact, patterns) = wildcard::partition(condition.metric_names());
    if exact.is_empty() && patterns.is_empty() {
        return Clause::default();
    }

    let negate = condition.metric_names_not();
    let joiner = joiner(negate);
    let mut groups = Vec::with_capacity(2);
    if !exact.is_empty() {
        groups.push(format!(
            "METRIC_NAME {}IN ({})",
            not(negate),
            placeholders(exact.len())
        ));
    }
    if !patterns.is_empty() {
        let like = format!("METRIC_NAME {}LIKE ?", not(negate));
        groups.push(vec![like; patterns.len()].join(joiner));
    }

    let ordered: Vec<String> = exact.into_iter().chain(patterns).collect();
    let binds = ordered.iter().cloned().map(BindValue::Text).collect();
    condition.set_metric_names(ordered);

    Clause::new(format!("({})", groups.join(joiner)), binds)
}

pub fn host_clause(condition: &Condition) -> Clause {
    let Some(hosts) = condition.hostnames().filter(|hosts| !hosts.is_empty()) else {
        return Clause::default();
    };

    let negate = condition.hostnames_not();
    let binds = hosts.iter().cloned().map(BindValue::Text).collect();
    let sql = if wildcard::any_wildcard(hosts) {
        let like = format!("HOSTNAME {}LIKE ?", not(negate));
        format!("({})", vec![like; hosts.len()].join(joiner(negate)))
    } else if hosts.len() > 1 {
        format!("HOSTNAME {}IN ({})", not(negate), placeholders(hosts.len()))
    } else if negate {
        "HOSTNAME <> ?".to_string()
    } else {
        "HOSTNAME = ?".to_string()
    };
    Clause::new(sql, binds)
}

pub fn app_clause(condition: &Condition) -> Clause {
    let Some(app_id) = condition.app_id() else {
        return Clause::default();
    };
    let sql = if wildcard::is_wildcard(&app_id) {
        "APP_ID LIKE ?"
    } else {
        "APP_ID = ?"
    };
    Clause::new(sql, vec![BindValue::Text(app_id.into_owned())])
}

pub fn instance_clause(condition: &Condition) -> Clause {
    let Some(instance_id) = condition.instance_id().filter(|id| *id != "%") else {
        return Clause::default();
    };
    let sql = if wildcard::is_wildcard(instance_id) {
        "INSTANCE_ID LIKE ?"
    } else {
        "INSTANCE_ID = ?"
    };
    Clause::new(sql, vec![BindValue::from(instance_id)])
}

pub fn time_clause(condition: &Condition) -> Clause {
    let mut clause = Clause::default();
    if let Some(start) = condition.start_time() {
        clause.push_and(Clause::new("SERVER_TIME >= ?", vec![BindValue::BigInt(start)]));
    }
    if let Some(end) = condition.end_time() {
        clause.push_and(Clause::new("SERVER_TIME < ?", vec![BindValue::BigInt(end)]));
    }
    clause
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn not(negate: bool) -> &'static str {
    if negate {
        "NOT "
    } else {
        ""
    }
}

fn joiner(negate: bool) -> &'static str {
    if negate {
        " AND "
    } else {
        " OR "
    }
}
