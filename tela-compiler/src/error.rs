#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}
