//! Tool providers module
//!
//! Contains implementations of `ToolProvider` for different tool sources.

pub mod code_executor;
pub mod files;
pub mod todos;

pub use code_executor::{CodeExecutorProvider, EXECUTION_ERROR_PREFIX};
pub use files::FilesProvider;
pub use todos::{TodoItem, TodoList, TodoStatus, TodosProvider};
