pub mod executor;
pub mod tool;

pub use executor::{isolate, Executor, ExecutorError, SequentialExecutor, TaskPanic};
pub use tool::{ExternalTool, FnTool, ToolError, ToolInput, ToolOutput};
