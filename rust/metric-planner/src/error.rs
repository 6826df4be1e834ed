use crate::precision::Precision;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlannerError>;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("condition is empty")]
    EmptyCondition,

    #[error(
        "requested {metrics} metrics for {hosts} hosts in {precision} precision for the time range of \
         {range_secs} seconds. Estimated resultset size of {estimated_rows} is greater than the limit \
         of {limit}. Request lower precision or fewer number of metrics or hosts"
    )]
    PrecisionLimitExceeded {
        metrics: usize,
        hosts: usize,
        precision: Precision,
        range_secs: i64,
        estimated_rows: i64,
        limit: i64,
    },

    #[error(
        "unsupported top-n shape ({metrics} metrics, {hosts} hosts): query can have either \
         multiple hosts or multiple metric names but not both"
    )]
    InvalidTopNShape { metrics: usize, hosts: usize },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl PlannerError {
    pub fn is_budget_violation(&self) -> bool {
        matches!(self, PlannerError::PrecisionLimitExceeded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precision_limit_message_names_every_dimension() {
        let err = PlannerError::PrecisionLimitExceeded {
            metrics: 50,
            hosts: 20,
            precision: Precision::Seconds,
            range_secs: 86_400,
            estimated_rows: 1_440_000,
            limit: 5760,
        };

        let message = err.to_string();
        assert!(message.contains("50 metrics"), "{message}");
        assert!(message.contains("20 hosts"), "{message}");
        assert!(message.contains("SECONDS precision"), "{message}");
        assert!(message.contains("86400 seconds"), "{message}");
        assert!(message.contains("1440000"), "{message}");
        assert!(message.contains("limit of 5760"), "{message}");
        assert!(err.is_budget_violation());
    }

    #[test]
    fn empty_condition_is_not_a_budget_violation() {
        assert!(!PlannerError::EmptyCondition.is_budget_violation());
        assert_eq!(PlannerError::EmptyCondition.to_string(), "condition is empty");
    }
}
