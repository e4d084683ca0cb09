#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("path not found")]
    NotFound,

    #[error("permission denied")]
    PermissionDenied,

    #[error("already exists")]
    AlreadyExists,

    #[error("destination path is a directory")]
    IsADirectory,

    #[error("i/o failure: {0}")]
    Io(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FsError>;

pub fn from_io(err: std::io::Error) -> FsError {
    match err.kind() {
        std::io::ErrorKind::NotFound => FsError::NotFound,
        std::io::ErrorKind::PermissionDenied => FsError::PermissionDenied,
        std::io::ErrorKind::AlreadyExists => FsError::AlreadyExists,
        _ => FsError::Io(err),
    }
}

impl From<std::io::Error> for FsError {
    fn from(err: std::io::Error) -> Self { from_io(err) }
}
