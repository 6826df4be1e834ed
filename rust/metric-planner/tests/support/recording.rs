use metric_planner::connection::{PreparedStatement, StatementConnection};
use std::sync::{Arc, Mutex};

/// One interaction a planner had with the fake connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Prepare(String),
    Bytes(usize, Vec<u8>),
    Text(usize, String),
    BigInt(usize, i64),
    FetchSize(i32),
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingError(pub String);

/// Records every call; optionally fails the bind at one position.
#[derive(Debug, Clone, Default)]
pub struct RecordingConnection {
    calls: Arc<Mutex<Vec<Call>>>,
    fail_at: Option<usize>,
}

pub struct RecordingStatement {
    calls: Arc<Mutex<Vec<Call>>>,
    fail_at: Option<usize>,
}

impl RecordingConnection {
    pub fn failing_at(position: usize) -> Self {
        Self {
            fail_at: Some(position),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// Bound values in position order, rendered as text for easy comparison.
    pub fn bound_values(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Bytes(_, bytes) => Some(format!("{bytes:?}")),
                Call::Text(_, text) => Some(text),
                Call::BigInt(_, value) => Some(value.to_string()),
                _ => None,
            })
            .collect()
    }
}

impl StatementConnection for RecordingConnection {
    type Statement = RecordingStatement;
    type Error = RecordingError;

    fn prepare(&mut self, sql: &str) -> Result<RecordingStatement, RecordingError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(Call::Prepare(sql.to_string()));
        Ok(RecordingStatement {
            calls: Arc::clone(&self.calls),
            fail_at: self.fail_at,
        })
    }
}

impl RecordingStatement {
    fn record(&self, position: usize, call: Call) -> Result<(), RecordingError> {
        if self.fail_at == Some(position) {
            return Err(RecordingError(format!("bind {position} rejected")));
        }
        self.calls.lock().expect("calls lock").push(call);
        Ok(())
    }
}

impl PreparedStatement for RecordingStatement {
    type Error = RecordingError;

    fn bind_bytes(&mut self, position: usize, value: &[u8]) -> Result<(), RecordingError> {
        self.record(position, Call::Bytes(position, value.to_vec()))
    }

    fn bind_text(&mut self, position: usize, value: &str) -> Result<(), RecordingError> {
        self.record(position, Call::Text(position, value.to_string()))
    }

    fn bind_i64(&mut self, position: usize, value: i64) -> Result<(), RecordingError> {
        self.record(position, Call::BigInt(position, value))
    }

    fn set_fetch_size(&mut self, rows: i32) -> Result<(), RecordingError> {
        self.calls.lock().expect("calls lock").push(Call::FetchSize(rows));
        Ok(())
    }

    fn close(self) {
        self.calls.lock().expect("calls lock").push(Call::Close);
    }
}
