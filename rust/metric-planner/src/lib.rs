//! Query planning for a time-series metric store: picks the table and precision
//! for a condition, renders parameterized SQL and binds it onto a prepared
//! statement in placeholder order.

pub mod bind;
pub mod budget;
pub mod catalog;
pub mod clause;
pub mod condition;
pub mod config;
pub mod connection;
pub mod error;
pub mod precision;
pub mod statement;
pub mod telemetry;
pub mod wildcard;

pub use bind::BindValue;
pub use condition::{Condition, ConditionBuilder, ConditionKind, SplitByMetricNames};
pub use config::PlannerConfig;
pub use error::{PlannerError, Result};
pub use precision::{Precision, ReadFunction};
pub use statement::{prepare_statement, PlannedStatement, StatementPlanner};
