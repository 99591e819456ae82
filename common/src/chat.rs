use serde::{Deserialize, Serialize};

use crate::ids::{ConversationId, ProductId, UserId};

/// Seconds between message polls while a chat panel is open.
pub const POLL_INTERVAL_SECS: u64 = 5;

/// Multipart field name the media endpoint expects the image under.
pub const MEDIA_FIELD: &str = "image";

/// A buyer/seller thread about one product. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub product_id: ProductId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
}

/// The triple a conversation is keyed on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationKey {
    pub product_id: ProductId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
}

impl ConversationKey {
    pub fn new(product_id: ProductId, buyer_id: UserId, seller_id: UserId) -> Self {
        Self {
            product_id,
            buyer_id,
            seller_id,
        }
    }

    /// The participant that is not `user`, if `user` is a participant.
    pub fn counterpart(&self, user: &UserId) -> Option<&UserId> {
        if &self.buyer_id == user {
            Some(&self.seller_id)
        } else if &self.seller_id == user {
            Some(&self.buyer_id)
        } else {
            None
        }
    }
}

// ---------- Wire types ----------

/// Response of `POST /messages/start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartConversationResponse {
    pub conversation_id: ConversationId,
}

/// Body of `POST /messages/send`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub content: String,
    pub media_url: Option<String>,
}

impl SendMessageRequest {
    /// Same rule the client applies before sending: some text or some media.
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty() && self.media_url.as_deref().map_or(true, str::is_empty)
    }
}

/// Response of `POST /uploadImage/uploadMessageMedia`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
}

/// Response of `GET /users/getName/:id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserNameResponse {
    pub name: String,
}

/// Generic acknowledgement, e.g. from `DELETE /messages/:id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: Option<String>,
}

/// Error payload carried by every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> ConversationKey {
        ConversationKey::new("p1".into(), "buyer".into(), "seller".into())
    }

    #[test]
    fn start_request_is_camel_case() {
        let json = serde_json::to_value(key()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"productId": "p1", "buyerId": "buyer", "sellerId": "seller"})
        );
    }

    #[test]
    fn send_request_serializes_null_media() {
        let req = SendMessageRequest {
            conversation_id: "c1".into(),
            sender_id: "buyer".into(),
            content: "hello".into(),
            media_url: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["mediaUrl"], serde_json::Value::Null);
        assert_eq!(json["conversationId"], "c1");
    }

    #[test]
    fn empty_send_request() {
        let mut req = SendMessageRequest {
            conversation_id: "c1".into(),
            sender_id: "buyer".into(),
            content: "   ".into(),
            media_url: None,
        };
        assert!(req.is_empty());
        req.media_url = Some("https://img.example/x.png".into());
        assert!(!req.is_empty());
    }

    #[test]
    fn counterpart_of_participants() {
        let k = key();
        assert_eq!(k.counterpart(&"buyer".into()), Some(&UserId::new("seller")));
        assert_eq!(k.counterpart(&"seller".into()), Some(&UserId::new("buyer")));
        assert_eq!(k.counterpart(&"someone".into()), None);
    }
}
