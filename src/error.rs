use thiserror::Error;

#[derive(Debug, Error)]
pub enum PixmarkError {
    #[error("no image loaded")]
    NoImage,

    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("unsupported export format '{0}'")]
    UnsupportedFormat(String),

    #[error("unknown effect '{0}'")]
    UnknownEffect(String),

    #[error("invalid parameter for {effect}: {detail}")]
    InvalidParameter { effect: String, detail: String },

    #[error("project file error: {0}")]
    Project(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<Box<bincode::ErrorKind>> for PixmarkError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        PixmarkError::Project(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PixmarkError>;
