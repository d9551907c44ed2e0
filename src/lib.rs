// Library surface for the host binary and headless/integration tests.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod budget;
pub mod config;
pub mod dwell;
pub mod error;
pub mod ladder;
pub mod level;
pub mod level_pack;
pub mod question;
pub mod report;
pub mod runtime;
pub mod scheduler;
pub mod session;
pub mod stats;
pub mod timer;
pub mod util;

pub use error::{LevelError, ReportError, SessionError};
pub use level::{ExerciseLevel, GridPattern, QuestionType};
pub use report::{ResultReporter, SessionSummary};
pub use session::{Phase, SessionConfig, SessionEvent, SessionStateMachine};
