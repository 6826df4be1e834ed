mod recording;

#[allow(unused_imports)]
pub use recording::{Call, RecordingConnection, RecordingError, RecordingStatement};
