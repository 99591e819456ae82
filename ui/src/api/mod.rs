//! Interfaces to the external collaborators: the marketplace REST backend
//! and the geography lookup service.
//!
//! The chat engine and the address filter depend only on the traits here.
//! [`HttpClient`] and [`GeoClient`] are the production implementations.

mod geo;
mod http;

use std::rc::Rc;

use bazaar_common::address::{AddressLevel, OptionsRequest};
use bazaar_common::chat::{ConversationKey, SendMessageRequest};
use bazaar_common::ids::{ConversationId, MessageId, UserId};
use bazaar_common::message::Message;

use crate::chat::draft::Attachment;

pub use geo::GeoClient;
pub use http::HttpClient;

/// Generic text shown when the server gave us nothing better.
pub const GENERIC_ERROR: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("network error: {0}")]
    Transport(String),
    /// The server answered with a non-success status.
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
    /// The response body was not what the endpoint promises.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Text suitable for showing to the user verbatim.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Server { message, .. } if !message.is_empty() => message.clone(),
            ApiError::Transport(_) => "Network error. Check your connection.".to_string(),
            _ => GENERIC_ERROR.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

/// The backend operations a chat session needs.
///
/// Futures are not required to be `Send`: the browser runs everything on
/// one event loop.
#[allow(async_fn_in_trait)]
pub trait ChatBackend {
    /// `POST /messages/start`: get or create the conversation for a triple.
    async fn start_conversation(&self, key: &ConversationKey) -> Result<ConversationId, ApiError>;

    /// `GET /messages/:conversationId`: the full, ordered message list.
    async fn fetch_messages(&self, conversation: &ConversationId) -> Result<Vec<Message>, ApiError>;

    /// `POST /uploadImage/uploadMessageMedia`: store an image, returning its URL.
    async fn upload_media(&self, attachment: &Attachment) -> Result<String, ApiError>;

    /// `POST /messages/send`.
    async fn send_message(&self, request: &SendMessageRequest) -> Result<(), ApiError>;

    /// `DELETE /messages/:messageId`. The backend decides whether the caller may.
    async fn delete_message(&self, message: &MessageId) -> Result<(), ApiError>;

    /// `GET /users/getName/:id`: display name only.
    async fn user_name(&self, user: &UserId) -> Result<String, ApiError>;
}

/// Option lists for the cascading address filter.
#[allow(async_fn_in_trait)]
pub trait GeoBackend {
    async fn divisions(&self) -> Result<Vec<String>, ApiError>;
    async fn districts(&self, division: &str) -> Result<Vec<String>, ApiError>;
    async fn wards(&self, district: &str) -> Result<Vec<String>, ApiError>;
    async fn areas(&self, ward: &str) -> Result<Vec<String>, ApiError>;

    /// Perform the lookup an [`AddressFilter`] asked for.
    ///
    /// [`AddressFilter`]: bazaar_common::address::AddressFilter
    async fn options_for(&self, request: &OptionsRequest) -> Result<Vec<String>, ApiError> {
        let Some(parent) = request.parent.as_deref() else {
            return match request.level {
                AddressLevel::Division => self.divisions().await,
                _ => Ok(Vec::new()),
            };
        };
        match request.level {
            AddressLevel::Division => self.divisions().await,
            AddressLevel::District => self.districts(parent).await,
            AddressLevel::Ward => self.wards(parent).await,
            AddressLevel::Area => self.areas(parent).await,
        }
    }
}

impl<T: ChatBackend> ChatBackend for Rc<T> {
    async fn start_conversation(&self, key: &ConversationKey) -> Result<ConversationId, ApiError> {
        (**self).start_conversation(key).await
    }

    async fn fetch_messages(&self, conversation: &ConversationId) -> Result<Vec<Message>, ApiError> {
        (**self).fetch_messages(conversation).await
    }

    async fn upload_media(&self, attachment: &Attachment) -> Result<String, ApiError> {
        (**self).upload_media(attachment).await
    }

    async fn send_message(&self, request: &SendMessageRequest) -> Result<(), ApiError> {
        (**self).send_message(request).await
    }

    async fn delete_message(&self, message: &MessageId) -> Result<(), ApiError> {
        (**self).delete_message(message).await
    }

    async fn user_name(&self, user: &UserId) -> Result<String, ApiError> {
        (**self).user_name(user).await
    }
}

impl<T: GeoBackend> GeoBackend for Rc<T> {
    async fn divisions(&self) -> Result<Vec<String>, ApiError> {
        (**self).divisions().await
    }

    async fn districts(&self, division: &str) -> Result<Vec<String>, ApiError> {
        (**self).districts(division).await
    }

    async fn wards(&self, district: &str) -> Result<Vec<String>, ApiError> {
        (**self).wards(district).await
    }

    async fn areas(&self, ward: &str) -> Result<Vec<String>, ApiError> {
        (**self).areas(ward).await
    }
}

/// Percent-encode a single URL path segment.
pub(crate) fn encode_segment(s: &str) -> String {
    s.bytes()
        .map(|b| match b {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_is_surfaced_verbatim() {
        let err = ApiError::Server {
            status: 403,
            message: "You can only delete your own messages".into(),
        };
        assert_eq!(err.user_message(), "You can only delete your own messages");
        assert_eq!(err.status(), Some(403));
    }

    #[test]
    fn empty_server_message_falls_back() {
        let err = ApiError::Server {
            status: 500,
            message: String::new(),
        };
        assert_eq!(err.user_message(), GENERIC_ERROR);
        assert_eq!(ApiError::Decode("eof".into()).user_message(), GENERIC_ERROR);
    }

    struct Places;

    impl GeoBackend for Places {
        async fn divisions(&self) -> Result<Vec<String>, ApiError> {
            Ok(vec!["Dhaka".into()])
        }
        async fn districts(&self, division: &str) -> Result<Vec<String>, ApiError> {
            Ok(vec![format!("district of {division}")])
        }
        async fn wards(&self, district: &str) -> Result<Vec<String>, ApiError> {
            Ok(vec![format!("ward of {district}")])
        }
        async fn areas(&self, ward: &str) -> Result<Vec<String>, ApiError> {
            Ok(vec![format!("area of {ward}")])
        }
    }

    #[tokio::test]
    async fn options_follow_the_requested_level() {
        let request = |level, parent: Option<&str>| OptionsRequest {
            level,
            parent: parent.map(str::to_string),
            token: 1,
        };
        assert_eq!(
            Places.options_for(&request(AddressLevel::Division, None)).await,
            Ok(vec!["Dhaka".to_string()])
        );
        assert_eq!(
            Places
                .options_for(&request(AddressLevel::Ward, Some("Gazipur")))
                .await,
            Ok(vec!["ward of Gazipur".to_string()])
        );
        // A child lookup without a parent has nothing to ask for.
        assert_eq!(
            Places.options_for(&request(AddressLevel::Area, None)).await,
            Ok(vec![])
        );
    }

    #[test]
    fn encodes_path_segments() {
        assert_eq!(encode_segment("Cox's Bazar"), "Cox%27s%20Bazar");
        assert_eq!(encode_segment("ward-7"), "ward-7");
        assert!(encode_segment("ঢাকা").starts_with("%E0%A6"));
    }
}
