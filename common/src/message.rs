use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::ids::{ConversationId, MessageId, UserId};

/// A message within a buyer/seller conversation.
///
/// Owned by the backend. Clients only ever hold a full snapshot of a
/// conversation's messages, replaced wholesale on every fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "MessageDocument")]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub content: String,
    pub media_urls: Vec<String>,
    pub sent_at: DateTime<Utc>,
}

/// A message as the backend writes it. Documents may carry `_id`, `id` or
/// both, and `mediaUrl`, `mediaUrls` or both.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageDocument {
    #[serde(rename = "_id")]
    object_id: Option<MessageId>,
    id: Option<MessageId>,
    conversation_id: ConversationId,
    sender_id: UserId,
    #[serde(default)]
    content: String,
    #[serde(default, deserialize_with = "one_or_many")]
    media_urls: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    media_url: Vec<String>,
    #[serde(alias = "createdAt")]
    sent_at: DateTime<Utc>,
}

impl TryFrom<MessageDocument> for Message {
    type Error = &'static str;

    fn try_from(doc: MessageDocument) -> Result<Self, Self::Error> {
        let id = doc.object_id.or(doc.id).ok_or("missing field `id`")?;
        let mut media_urls = doc.media_urls;
        for url in doc.media_url {
            if !media_urls.contains(&url) {
                media_urls.push(url);
            }
        }
        Ok(Self {
            id,
            conversation_id: doc.conversation_id,
            sender_id: doc.sender_id,
            content: doc.content,
            media_urls,
            sent_at: doc.sent_at,
        })
    }
}

impl Message {
    pub fn is_from(&self, user: &UserId) -> bool {
        &self.sender_id == user
    }

    pub fn has_media(&self) -> bool {
        !self.media_urls.is_empty()
    }
}

/// Older backends send a single nullable `mediaUrl` instead of an array.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(url)) if url.is_empty() => Vec::new(),
        Some(OneOrMany::One(url)) => vec![url],
        Some(OneOrMany::Many(urls)) => urls.into_iter().filter(|u| !u.is_empty()).collect(),
    })
}
