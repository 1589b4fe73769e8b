use taskbot_store::StoreError;

use crate::reply::{self, Reply};

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Store unavailable")]
    Unavailable,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("{message}")]
    Failed {
        message: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("{0} not found or no access")]
    NoAccess(&'static str),
}

impl CommandError {
    /// The chat message a failed command ends in.
    pub fn into_reply(self) -> Reply {
        let text = match self {
            CommandError::Unavailable => reply::DB_UNAVAILABLE.to_string(),
            CommandError::Store(e) => {
                tracing::error!("Store error: {:?}", e);
                reply::REQUEST_FAILED.to_string()
            }
            CommandError::Failed { message, source } => {
                tracing::error!("Store error: {:?}", source);
                message.to_string()
            }
            CommandError::Validation(message) => message,
            CommandError::Parse(e) => format!("❌ Error parsing data: {}", e),
            CommandError::NoAccess(subject) => {
                format!("❌ {} not found or you don't have access to it.", subject)
            }
        };

        Reply::text(text)
    }
}

/// Attach the message a store failure should be reported with.
pub trait OrFail<T> {
    fn or_fail(self, message: &'static str) -> Result<T, CommandError>;
}

impl<T> OrFail<T> for Result<T, StoreError> {
    fn or_fail(self, message: &'static str) -> Result<T, CommandError> {
        self.map_err(|source| CommandError::Failed { message, source })
    }
}
