use thiserror::Error;

use crate::config::ConfigError;
use it_worked_image::ImageError;

pub type Result<T> = std::result::Result<T, ItWorkedError>;

#[derive(Debug, Error)]
pub enum ItWorkedError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
