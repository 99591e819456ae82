use crate::api::ApiError;

/// Why a chat operation did not happen.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChatError {
    #[error("type a message or attach an image first")]
    EmptyMessage,
    #[error("the conversation is not ready yet")]
    NoConversation,
    #[error("a message is already being sent")]
    SendInFlight,
    #[error("the conversation is still being opened")]
    Resolving,
    #[error("a message is already being deleted")]
    DeleteInFlight,
    #[error("only your own messages can be deleted")]
    NotAuthor,
    #[error("the chat panel is closed")]
    Closed,
    #[error("image upload failed: {0}")]
    Upload(#[source] ApiError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ChatError {
    /// Caught locally before any request was made.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ChatError::EmptyMessage
                | ChatError::NoConversation
                | ChatError::SendInFlight
                | ChatError::Resolving
                | ChatError::DeleteInFlight
                | ChatError::NotAuthor
        )
    }

    /// Text for the panel's inline error line.
    pub fn user_message(&self) -> String {
        match self {
            ChatError::Upload(e) => format!("Image upload failed: {}", e.user_message()),
            ChatError::Api(e) => e.user_message(),
            other => {
                let text = other.to_string();
                let mut chars = text.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => text,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_flagged() {
        assert!(ChatError::EmptyMessage.is_validation());
        assert!(ChatError::NotAuthor.is_validation());
        assert!(!ChatError::Closed.is_validation());
        assert!(!ChatError::Api(ApiError::Transport("reset".into())).is_validation());
    }

    #[test]
    fn user_messages() {
        assert_eq!(
            ChatError::EmptyMessage.user_message(),
            "Type a message or attach an image first"
        );
        let upload = ChatError::Upload(ApiError::Server {
            status: 413,
            message: "File too large".into(),
        });
        assert_eq!(upload.user_message(), "Image upload failed: File too large");
    }
}
