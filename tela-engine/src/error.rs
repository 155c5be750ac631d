use crate::module::ModuleError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Generation state and on-disk output targets are not reentrant-safe;
    /// a second concurrent compilation fails instead of interleaving.
    #[error("a compilation is already in progress")]
    CompileInProgress,
    #[error("compilation canceled")]
    Canceled,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Module(#[from] ModuleError),
    #[error("watcher error: {0}")]
    Watch(String),
}
