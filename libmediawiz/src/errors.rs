use std::fmt::Formatter;

#[derive(Debug, PartialEq)]
pub enum MwError {
    /// Parameter is the names of every tool that could not be found
    MissingDependencies(Vec<String>),
    /// Parameter is the name of the first missing field
    IncompleteSession(&'static str),
    ErrorCreatingDestinationDirectory {
        path: String,
        message: String,
    },
    /// parameters are file path, additional error message
    FileOperationError {
        file_name: String,
        message: String,
    },
    ToolLaunchError {
        tool: String,
        message: String,
    },
    ConsoleError(String),
}

impl std::fmt::Display for MwError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let str = match self {
            MwError::MissingDependencies(tools) => {
                format!("required tools not found : {}", tools.join(", "))
            }
            MwError::IncompleteSession(field) => {
                format!("session is missing a value for {field}")
            }
            MwError::ErrorCreatingDestinationDirectory { path, message } => {
                format!("error creating destination directory {path}. {message}")
            }
            MwError::FileOperationError { file_name, message } => {
                format!("{message} : {file_name}")
            }
            MwError::ToolLaunchError { tool, message } => {
                format!("failed to start {tool}. {message}")
            }
            MwError::ConsoleError(err) => format!("error talking to the terminal. {err}"),
        };
        write!(f, "{str}")
    }
}

impl std::error::Error for MwError {}

pub type Result<T> = std::result::Result<T, MwError>;

impl MwError {
    pub(crate) fn file_op(path: &std::path::Path, e: std::io::Error) -> MwError {
        MwError::FileOperationError {
            file_name: path.to_string_lossy().to_string(),
            message: format!("{} | {}", e, e.kind()),
        }
    }
}
