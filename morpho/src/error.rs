use std::path::PathBuf;

use thiserror::Error;

/// The primary error type that can be produced by Morpho.
#[derive(Debug, Error)]
pub enum Error {
    #[error("view not found: {0}")]
    ViewNotFound(PathBuf),
    #[error("view \"{name}\" resolves to {path}, which is outside of the view root {root}")]
    ViewOutsideRoot {
        name: String,
        path: PathBuf,
        root: PathBuf,
    },
    #[error("failed to read view {0}: {1}")]
    ViewRead(PathBuf, std::io::Error),
    #[error("failed to render view \"{0}\": {1}")]
    ViewRender(String, #[source] handlebars::RenderError),
    #[error("failed to write rendered view \"{0}\": {1}")]
    Output(String, std::io::Error),
    #[error("the template manager has not been initialized - call TemplateManager::create first")]
    NotInitialized,
    #[error("failed to load configuration from file {0}")]
    FailedToLoadConfig(PathBuf),
    #[error("cannot determine file type of data file: {0}")]
    CannotDetermineDataFileType(PathBuf),
    #[error("invalid Markdown front matter: {0}")]
    InvalidMarkdownFrontMatter(String),
    #[error("failed to parse view name pattern \"{0}\": {1}")]
    ViewPattern(String, glob::PatternError),
    #[error("I/O error {0}: {1}")]
    Io(String, std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
