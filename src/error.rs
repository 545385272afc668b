use std::path::PathBuf;

use thiserror::Error;

use crate::tasks::TaskId;

pub type Result<A> = std::result::Result<A, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Encountered io error: `{0}`")]
    IOError(std::io::Error),
    #[error("Failed to walk directory: `{0}`")]
    WalkError(walkdir::Error),
    #[error("Failed to parse yaml: `{0}`")]
    SerdeError(serde_yml::Error),
    #[error("Failed to parse json: `{0}`")]
    JsonError(serde_json::Error),
    #[error("Error with templating: `{0}`")]
    JinjaError(minijinja::Error),
    #[error("Error watching files: `{0}`")]
    NotifyError(notify::Error),
    #[error("Invalid configuration: `{0}`")]
    ConfigError(Box<figment::Error>),
    #[error("Failed to process image: `{0}`")]
    ImageError(image::ImageError),
    #[error("Failed to compile `{path}`: {message}")]
    SassError { path: PathBuf, message: String },
    #[error("Failed to process css `{path}`: {message}")]
    CssError { path: PathBuf, message: String },
    #[error("Failed to minify script: {0}")]
    MinifyError(String),
    #[error("Unexpected path for a page: `{0}`")]
    PageError(PathBuf),
    #[error("Layout `{layout}` requested by `{page}` does not exist")]
    MissingLayout { page: PathBuf, layout: String },
    #[error("Task graph contains a cycle through `{0}`")]
    CycleError(TaskId),
    #[error("Task `{0}` panicked")]
    TaskPanic(TaskId),
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::IOError(value)
    }
}

impl From<walkdir::Error> for Error {
    fn from(value: walkdir::Error) -> Self {
        Self::WalkError(value)
    }
}

impl From<serde_yml::Error> for Error {
    fn from(value: serde_yml::Error) -> Self {
        Self::SerdeError(value)
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::JsonError(value)
    }
}

impl From<minijinja::Error> for Error {
    fn from(value: minijinja::Error) -> Self {
        Self::JinjaError(value)
    }
}

impl From<notify::Error> for Error {
    fn from(value: notify::Error) -> Self {
        Self::NotifyError(value)
    }
}

impl From<figment::Error> for Error {
    fn from(value: figment::Error) -> Self {
        Self::ConfigError(Box::new(value))
    }
}

impl From<image::ImageError> for Error {
    fn from(value: image::ImageError) -> Self {
        Self::ImageError(value)
    }
}
