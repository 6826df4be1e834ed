mod support;

use chrono::{DateTime, TimeZone, Utc};
use metric_planner::{
    connection::PgStatementConnection, prepare_statement, BindValue, Condition, PlannedStatement,
    PlannerConfig, PlannerError, Precision, ReadFunction, SplitByMetricNames, StatementPlanner,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use support::{Call, RecordingConnection, RecordingError};

fn clock() -> DateTime<Utc> {
    Utc.timestamp_millis_opt(2_000_000).unwrap()
}

fn planner(result_limit: i64) -> StatementPlanner {
    StatementPlanner::new(Arc::new(PlannerConfig::embedded(result_limit))).with_clock(clock)
}

fn numbered(prefix: &str, count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("{prefix}{i}")).collect()
}

#[test]
fn short_window_for_two_hosts_plans_at_seconds() {
    let condition = Condition::builder()
        .metric_names(["cpu_user"])
        .hostnames(["h1", "h2"])
        .start_time(1000)
        .end_time(2000)
        .build();

    let plan = planner(15_000).plan_get_metrics(&condition).unwrap();

    assert_eq!(plan.precision(), Some(Precision::Seconds));
    assert_eq!(
        plan.binds(),
        [
            BindValue::from("cpu_user"),
            BindValue::from("h1"),
            BindValue::from("h2"),
            BindValue::BigInt(1_000_000),
            BindValue::BigInt(2_000_000),
        ]
        .as_slice()
    );

    let mut conn = RecordingConnection::default();
    prepare_statement(&mut conn, &plan).unwrap();
    assert_eq!(
        conn.bound_values(),
        ["cpu_user", "h1", "h2", "1000000", "2000000"]
    );
}

#[test]
fn pinned_seconds_over_a_day_for_many_series_is_rejected() {
    let condition = Condition::builder()
        .metric_names(numbered("m", 50))
        .hostnames(numbered("h", 20))
        .start_time(1000)
        .end_time(1000 + 86_400)
        .precision(Precision::Seconds)
        .build();

    let err = planner(5760).plan_get_metrics(&condition).unwrap_err();

    assert!(err.is_budget_violation());
    let message = err.to_string();
    assert!(message.contains("50 metrics"), "{message}");
    assert!(message.contains("20 hosts"), "{message}");
    assert!(message.contains("SECONDS precision"), "{message}");
    assert!(message.contains("86400 seconds"), "{message}");
    assert!(message.contains("limit of 5760"), "{message}");
}

#[test]
fn top_n_ranks_hosts_by_peak_value() {
    let condition = Condition::builder()
        .metric_names(["cpu_user"])
        .hostnames(["h1", "h2", "h3"])
        .start_time(1000)
        .end_time(2000)
        .top_n(2)
        .build();

    let plan = planner(5760).plan_get_metrics(&condition).unwrap();

    assert!(
        plan.sql()
            .contains("GROUP BY UUID ORDER BY MAX(METRIC_MAX) DESC LIMIT 2)"),
        "{}",
        plan.sql()
    );
    assert!(plan.sql().ends_with(" ORDER BY UUID, SERVER_TIME LIMIT 5760"));
}

#[test]
fn top_n_over_identities_binds_inner_then_outer_window() {
    let condition = Condition::builder()
        .metric_names(["cpu_user"])
        .hostnames(["h1", "h2"])
        .uuids([vec![1u8; 16], vec![2u8; 16]])
        .start_time(1000)
        .end_time(2000)
        .top_n(2)
        .top_n_function(ReadFunction::Sum)
        .build();

    let plan = planner(5760).plan_get_metrics(&condition).unwrap();

    assert_eq!(
        plan.binds(),
        [
            BindValue::Bytes(vec![1u8; 16]),
            BindValue::Bytes(vec![2u8; 16]),
            BindValue::BigInt(1_000_000),
            BindValue::BigInt(2_000_000),
            BindValue::BigInt(1_000_000),
            BindValue::BigInt(2_000_000),
        ]
        .as_slice()
    );
    assert!(plan.sql().contains("ORDER BY SUM(METRIC_SUM) DESC LIMIT 2"));
}

#[test]
fn planned_names_follow_bind_order() {
    let condition = Condition::builder()
        .metric_names(["disk_%", "cpu_user", "mem_%", "cpu_system", "load_one"])
        .start_time(1000)
        .end_time(2000)
        .build();

    let plan = planner(5760).plan_get_aggregates(&condition).unwrap();

    assert_eq!(
        plan.condition().metric_names(),
        ["cpu_user", "cpu_system", "load_one", "disk_%", "mem_%"]
    );
    assert_eq!(
        condition.metric_names(),
        ["disk_%", "cpu_user", "mem_%", "cpu_system", "load_one"]
    );
    let bound: Vec<_> = plan.binds()[..5]
        .iter()
        .filter_map(BindValue::as_text)
        .collect();
    assert_eq!(bound, plan.condition().metric_names());
}

#[test]
fn every_plan_has_one_bind_per_placeholder() {
    let planner = planner(5760);
    let mut plans: Vec<PlannedStatement> = Vec::new();

    let full = Condition::builder()
        .metric_names(["cpu_user", "mem_%"])
        .hostnames(["h1", "web%"])
        .app_id("HOST")
        .instance_id("i-1")
        .start_time(1000)
        .end_time(2000)
        .build();
    plans.push(planner.plan_get_metrics(&full).unwrap());
    plans.push(planner.plan_get_aggregates(&full).unwrap());
    plans.push(planner.plan_get_latest(&full).unwrap());

    let top_n = Condition::builder()
        .metric_names(["a", "b%"])
        .hostnames(["h1"])
        .start_time(1000)
        .end_time(2000)
        .top_n(5)
        .bottom_n(true)
        .build();
    plans.push(planner.plan_get_metrics(&top_n).unwrap());

    let transient = Condition::builder()
        .transient_metric_names(["jvm.%", "gc.count"])
        .app_id("ams-hbase")
        .end_time(2000)
        .build();
    plans.push(planner.plan_transient_metrics(&transient).unwrap());

    plans.push(
        planner
            .plan_metadata_scan(&Condition::metric_metadata(
                ["cpu_user", "mem_%"],
                Some("datanode".into()),
                Some("i-%".into()),
            ))
            .unwrap(),
    );
    plans.push(
        planner
            .plan_metadata_scan(&Condition::host_metadata(["h1", "h2"]))
            .unwrap(),
    );

    let split = SplitByMetricNames::new(
        Condition::builder()
            .metric_names(["a"])
            .uuids([vec![9u8; 16]])
            .start_time(1000)
            .end_time(2000)
            .build(),
    );
    plans.extend(planner.plan_latest_aggregates(&split).unwrap());

    for plan in &plans {
        assert_eq!(plan.placeholder_count(), plan.binds().len(), "{}", plan.sql());
    }
}

#[test]
fn prepare_binds_positions_and_fetch_size() {
    let condition = Condition::builder()
        .metric_names(["cpu_user"])
        .uuids([vec![0xab, 0xcd]])
        .start_time(1000)
        .end_time(2000)
        .fetch_size(250)
        .build();
    let plan = planner(5760).plan_get_metrics(&condition).unwrap();

    let mut conn = RecordingConnection::default();
    prepare_statement(&mut conn, &plan).unwrap();

    assert_eq!(
        conn.calls(),
        vec![
            Call::Prepare(plan.sql().to_string()),
            Call::Bytes(1, vec![0xab, 0xcd]),
            Call::BigInt(2, 1_000_000),
            Call::BigInt(3, 2_000_000),
            Call::FetchSize(250),
        ]
    );
}

#[test]
fn failed_bind_closes_statement_and_returns_connection_error() {
    let condition = Condition::builder()
        .metric_names(["cpu_user"])
        .hostnames(["h1", "h2"])
        .start_time(1000)
        .end_time(2000)
        .build();
    let plan = planner(5760).plan_get_metrics(&condition).unwrap();

    let mut conn = RecordingConnection::failing_at(2);
    let err = prepare_statement(&mut conn, &plan).err();

    assert_eq!(err, Some(RecordingError("bind 2 rejected".to_string())));
    assert_eq!(
        conn.calls(),
        vec![
            Call::Prepare(plan.sql().to_string()),
            Call::Text(1, "cpu_user".to_string()),
            Call::Close,
        ]
    );
}

#[test]
fn postgres_adapter_receives_every_bind() {
    let condition = Condition::builder()
        .metric_names(["cpu_user", "cpu_%"])
        .hostnames(["h1"])
        .start_time(1000)
        .end_time(2000)
        .build();
    let plan = planner(5760).plan_get_metrics(&condition).unwrap();

    let mut conn = PgStatementConnection;
    let statement = prepare_statement(&mut conn, &plan).unwrap();

    assert_eq!(statement.bound(), plan.binds().len());
    assert!(statement.sql().contains("METRIC_NAME IN ($1) OR METRIC_NAME LIKE $2"));
    assert!(statement.into_query().is_ok());
}

#[test]
fn empty_condition_never_reaches_the_connection() {
    let err = planner(5760)
        .plan_get_aggregates(&Condition::builder().build())
        .unwrap_err();
    assert!(matches!(err, PlannerError::EmptyCondition));
}
