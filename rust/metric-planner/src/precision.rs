//! Table granularities and the read functions used for top-n ranking.

use crate::error::{PlannerError, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Precision {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl Precision {
    /// Finest to coarsest; the order the budget search walks.
    pub const ALL: [Precision; 4] = [
        Precision::Seconds,
        Precision::Minutes,
        Precision::Hours,
        Precision::Days,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Precision::Seconds => "SECONDS",
            Precision::Minutes => "MINUTES",
            Precision::Hours => "HOURS",
            Precision::Days => "DAYS",
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Precision {
    type Err = PlannerError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "seconds" => Ok(Precision::Seconds),
            "minutes" => Ok(Precision::Minutes),
            "hours" => Ok(Precision::Hours),
            "days" => Ok(Precision::Days),
            other => Err(PlannerError::InvalidRequest(format!(
                "invalid precision '{other}', expected one of seconds, minutes, hours, days"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadFunction {
    Value,
    Avg,
    Min,
    Max,
    Sum,
}

impl FromStr for ReadFunction {
    type Err = PlannerError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().trim_start_matches('_').to_ascii_lowercase().as_str() {
            "value" => Ok(ReadFunction::Value),
            "avg" => Ok(ReadFunction::Avg),
            "min" => Ok(ReadFunction::Min),
            "max" => Ok(ReadFunction::Max),
            "sum" => Ok(ReadFunction::Sum),
            other => Err(PlannerError::InvalidRequest(format!(
                "unsupported read function '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_precision_case_insensitively() {
        assert_eq!("Minutes".parse::<Precision>().unwrap(), Precision::Minutes);
        assert_eq!(" days ".parse::<Precision>().unwrap(), Precision::Days);
        assert!("weeks".parse::<Precision>().is_err());
    }

    #[test]
    fn parses_read_function_with_metric_suffix_form() {
        assert_eq!("_avg".parse::<ReadFunction>().unwrap(), ReadFunction::Avg);
        assert_eq!("SUM".parse::<ReadFunction>().unwrap(), ReadFunction::Sum);
        assert!("rate".parse::<ReadFunction>().is_err());
    }

    #[test]
    fn search_order_runs_finest_first() {
        assert_eq!(Precision::ALL.first(), Some(&Precision::Seconds));
        assert_eq!(Precision::ALL.last(), Some(&Precision::Days));
    }
}
