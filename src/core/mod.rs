pub mod error;
pub mod readiness;
pub mod session;
pub mod transcript;

pub use error::{AppError, Result};
pub use readiness::{MonitorHandle, Readiness, ReadinessMonitor, ReadinessState, UnreachableCause};
pub use session::{ChatSession, STREAM_ERROR_MARKER};
pub use transcript::{Message, Role, Transcript};
