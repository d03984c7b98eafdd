pub mod compile_command;
pub mod database;
pub mod index;

pub use compile_command::CompileCommand;
pub use database::JsonCompilationDatabase;
pub use index::{CompilationIndex, CompileInfo};
