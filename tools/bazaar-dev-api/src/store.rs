//! In-memory data behind the dev API.

use std::collections::HashMap;

use chrono::Utc;
use rand::Rng;
use serde::Deserialize;

use bazaar_common::chat::{Conversation, ConversationKey, SendMessageRequest};
use bazaar_common::ids::{ConversationId, MessageId, UserId};
use bazaar_common::message::Message;
use bazaar_common::product::Product;

use crate::error::ApiError;

/// Initial data, loaded from the `--seed` JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seed {
    #[serde(default)]
    pub users: Vec<SeedUser>,
    #[serde(default)]
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    pub id: UserId,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct StoredMedia {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct Store {
    users: HashMap<UserId, String>,
    products: Vec<Product>,
    conversations: Vec<Conversation>,
    messages: Vec<Message>,
    media: HashMap<String, StoredMedia>,
}

/// 24 hex characters, the shape of the production backend's ids.
pub fn new_id() -> String {
    let mut rng = rand::thread_rng();
    (0..12).map(|_| format!("{:02x}", rng.gen::<u8>())).collect()
}

impl Store {
    pub fn new(seed: Seed) -> Self {
        Self {
            users: seed.users.into_iter().map(|u| (u.id, u.name)).collect(),
            products: seed.products,
            ..Self::default()
        }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn user_name(&self, user: &UserId) -> Result<&str, ApiError> {
        self.users
            .get(user)
            .map(String::as_str)
            .ok_or_else(|| ApiError::NotFound("User not found".into()))
    }

    /// Get or create the conversation for a (product, buyer, seller) triple.
    pub fn start_conversation(&mut self, key: ConversationKey) -> Result<ConversationId, ApiError> {
        if key.product_id.as_str().is_empty()
            || key.buyer_id.as_str().is_empty()
            || key.seller_id.as_str().is_empty()
        {
            return Err(ApiError::BadRequest(
                "productId, buyerId and sellerId are required".into(),
            ));
        }
        if key.buyer_id == key.seller_id {
            return Err(ApiError::BadRequest(
                "You cannot start a conversation with yourself".into(),
            ));
        }
        if let Some(existing) = self.conversations.iter().find(|c| {
            c.product_id == key.product_id && c.buyer_id == key.buyer_id && c.seller_id == key.seller_id
        }) {
            return Ok(existing.id.clone());
        }
        let conversation = Conversation {
            id: ConversationId::new(new_id()),
            product_id: key.product_id,
            buyer_id: key.buyer_id,
            seller_id: key.seller_id,
        };
        let id = conversation.id.clone();
        tracing::info!(conversation = %id, "conversation created");
        self.conversations.push(conversation);
        Ok(id)
    }

    fn conversation(&self, id: &ConversationId) -> Result<&Conversation, ApiError> {
        self.conversations
            .iter()
            .find(|c| &c.id == id)
            .ok_or_else(|| ApiError::NotFound("Conversation not found".into()))
    }

    /// Every message in the conversation, oldest first.
    pub fn messages(&self, conversation: &ConversationId) -> Result<Vec<Message>, ApiError> {
        self.conversation(conversation)?;
        Ok(self
            .messages
            .iter()
            .filter(|m| &m.conversation_id == conversation)
            .cloned()
            .collect())
    }

    /// `caller` is the authenticated user, when the request carried a token.
    pub fn send(
        &mut self,
        caller: Option<&UserId>,
        request: SendMessageRequest,
    ) -> Result<Message, ApiError> {
        if request.is_empty() {
            return Err(ApiError::BadRequest("Message must have text or media".into()));
        }
        let conversation = self.conversation(&request.conversation_id)?;
        if conversation.buyer_id != request.sender_id && conversation.seller_id != request.sender_id {
            return Err(ApiError::Forbidden(
                "You are not part of this conversation".into(),
            ));
        }
        if caller.is_some_and(|c| c != &request.sender_id) {
            return Err(ApiError::Forbidden("You can only send as yourself".into()));
        }
        let message = Message {
            id: MessageId::new(new_id()),
            conversation_id: request.conversation_id,
            sender_id: request.sender_id,
            content: request.content.trim().to_string(),
            media_urls: request.media_url.into_iter().filter(|u| !u.is_empty()).collect(),
            sent_at: Utc::now(),
        };
        self.messages.push(message.clone());
        Ok(message)
    }

    /// Only the author may delete a message.
    pub fn delete(&mut self, caller: Option<&UserId>, id: &MessageId) -> Result<(), ApiError> {
        let caller = caller.ok_or(ApiError::Unauthorized)?;
        let index = self
            .messages
            .iter()
            .position(|m| &m.id == id)
            .ok_or_else(|| ApiError::NotFound("Message not found".into()))?;
        if &self.messages[index].sender_id != caller {
            return Err(ApiError::Forbidden(
                "You can only delete your own messages".into(),
            ));
        }
        self.messages.remove(index);
        Ok(())
    }

    pub fn put_media(&mut self, media: StoredMedia) -> Result<String, ApiError> {
        if !media.content_type.starts_with("image/") {
            return Err(ApiError::BadRequest("Only images can be uploaded".into()));
        }
        if media.bytes.is_empty() {
            return Err(ApiError::BadRequest("Uploaded file is empty".into()));
        }
        let id = new_id();
        self.media.insert(id.clone(), media);
        Ok(id)
    }

    pub fn media(&self, id: &str) -> Result<&StoredMedia, ApiError> {
        self.media
            .get(id)
            .ok_or_else(|| ApiError::NotFound("Media not found".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> ConversationKey {
        ConversationKey::new("p1".into(), "buyer".into(), "seller".into())
    }

    fn send(store: &mut Store, conversation: &ConversationId, sender: &str, text: &str) -> Message {
        store
            .send(
                None,
                SendMessageRequest {
                    conversation_id: conversation.clone(),
                    sender_id: sender.into(),
                    content: text.into(),
                    media_url: None,
                },
            )
            .unwrap()
    }

    #[test]
    fn start_is_get_or_create() {
        let mut store = Store::default();
        let a = store.start_conversation(key()).unwrap();
        let b = store.start_conversation(key()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 24);

        let other = ConversationKey::new("p2".into(), "buyer".into(), "seller".into());
        assert_ne!(store.start_conversation(other).unwrap(), a);
    }

    #[test]
    fn start_rejects_self_chat() {
        let mut store = Store::default();
        let key = ConversationKey::new("p1".into(), "u".into(), "u".into());
        assert!(matches!(store.start_conversation(key), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn messages_keep_send_order() {
        let mut store = Store::default();
        let c = store.start_conversation(key()).unwrap();
        send(&mut store, &c, "buyer", " hi ");
        send(&mut store, &c, "seller", "hello");
        let contents: Vec<String> = store.messages(&c).unwrap().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["hi", "hello"]);
    }

    #[test]
    fn send_validates() {
        let mut store = Store::default();
        let c = store.start_conversation(key()).unwrap();
        let request = |sender: &str, content: &str| SendMessageRequest {
            conversation_id: c.clone(),
            sender_id: sender.into(),
            content: content.into(),
            media_url: None,
        };
        assert!(matches!(store.send(None, request("buyer", "  ")), Err(ApiError::BadRequest(_))));
        assert!(matches!(store.send(None, request("stranger", "hi")), Err(ApiError::Forbidden(_))));
        assert!(matches!(
            store.send(Some(&"seller".into()), request("buyer", "hi")),
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            store.messages(&"nope".into()),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn only_author_may_delete() {
        let mut store = Store::default();
        let c = store.start_conversation(key()).unwrap();
        let m = send(&mut store, &c, "buyer", "oops");

        assert_eq!(store.delete(None, &m.id), Err(ApiError::Unauthorized));
        assert!(matches!(
            store.delete(Some(&"seller".into()), &m.id),
            Err(ApiError::Forbidden(_))
        ));
        assert_eq!(store.messages(&c).unwrap().len(), 1);

        store.delete(Some(&"buyer".into()), &m.id).unwrap();
        assert!(store.messages(&c).unwrap().is_empty());
        assert!(matches!(
            store.delete(Some(&"buyer".into()), &m.id),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn media_must_be_an_image() {
        let mut store = Store::default();
        let text = StoredMedia {
            content_type: "text/plain".into(),
            bytes: b"hi".to_vec(),
        };
        assert!(store.put_media(text).is_err());

        let png = StoredMedia {
            content_type: "image/png".into(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        };
        let id = store.put_media(png).unwrap();
        assert_eq!(store.media(&id).unwrap().content_type, "image/png");
    }

    #[test]
    fn seed_loads_users_and_products() {
        let seed: Seed = serde_json::from_value(serde_json::json!({
            "users": [{"id": "seller", "name": "Karim Store"}],
            "products": [{
                "_id": "p1",
                "sellerId": "seller",
                "title": "Jute bag",
                "price": 15000,
                "address": {"division": "Dhaka", "district": "Gazipur", "ward": "", "area": ""},
                "createdAt": "2026-01-05T10:00:00Z"
            }]
        }))
        .unwrap();
        let store = Store::new(seed);
        assert_eq!(store.user_name(&"seller".into()).unwrap(), "Karim Store");
        assert_eq!(store.products().len(), 1);
        assert!(store.user_name(&"ghost".into()).is_err());
    }
}
