//! Built-in export strategies, one per tool family

mod forms;
mod themes;
mod workflows;

pub use forms::FormStrategy;
pub use themes::ThemeStrategy;
pub use workflows::WorkflowStrategy;
