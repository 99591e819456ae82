//! In-memory backend with scripted latency and failures.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use chrono::{TimeZone, Utc};

use bazaar_common::chat::{ConversationKey, SendMessageRequest};
use bazaar_common::ids::{ConversationId, MessageId, UserId};
use bazaar_common::message::Message;

use crate::api::{ApiError, ChatBackend};
use crate::chat::draft::Attachment;

pub const CONVERSATION: &str = "c1";

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Start(ConversationKey),
    Fetch(ConversationId),
    /// By file name.
    Upload(String),
    Send(SendMessageRequest),
    Delete(MessageId),
    Name(UserId),
}

#[derive(Default)]
pub struct ScriptedBackend {
    calls: RefCell<Vec<Call>>,
    messages: RefCell<Vec<Message>>,
    names: RefCell<HashMap<UserId, String>>,
    scripted_fetches: RefCell<VecDeque<(Duration, Vec<Message>)>>,
    next_id: Cell<u64>,
    pub fail_start: Cell<bool>,
    pub fail_upload: Cell<bool>,
    pub fail_send: Cell<bool>,
    pub fail_delete: Cell<bool>,
    pub send_delay: Cell<Duration>,
    pub fetch_delay: Cell<Duration>,
}

impl ScriptedBackend {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn reset_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Store a message server-side, as if another client had sent it.
    pub fn seed(&self, sender: &str, content: &str) {
        let message = self.message(sender.into(), content.to_string(), Vec::new());
        self.messages.borrow_mut().push(message);
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.borrow().clone()
    }

    /// The next fetch answers with `messages` after `delay`, whatever the
    /// stored list holds by then.
    pub fn script_fetch(&self, delay: Duration, messages: Vec<Message>) {
        self.scripted_fetches
            .borrow_mut()
            .push_back((delay, messages));
    }

    pub fn set_name(&self, user: &str, name: &str) {
        self.names.borrow_mut().insert(user.into(), name.to_string());
    }

    fn message(&self, sender: UserId, content: String, media_urls: Vec<String>) -> Message {
        let n = self.next_id.get() + 1;
        self.next_id.set(n);
        Message {
            id: MessageId::new(format!("m{n}")),
            conversation_id: CONVERSATION.into(),
            sender_id: sender,
            content,
            media_urls,
            sent_at: Utc.timestamp_opt(1_700_000_000 + n as i64 * 60, 0).unwrap(),
        }
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

fn server(status: u16, message: &str) -> ApiError {
    ApiError::Server {
        status,
        message: message.to_string(),
    }
}

impl ChatBackend for ScriptedBackend {
    async fn start_conversation(&self, key: &ConversationKey) -> Result<ConversationId, ApiError> {
        self.record(Call::Start(key.clone()));
        if self.fail_start.get() {
            return Err(server(500, "Could not start conversation"));
        }
        Ok(CONVERSATION.into())
    }

    async fn fetch_messages(&self, conversation: &ConversationId) -> Result<Vec<Message>, ApiError> {
        self.record(Call::Fetch(conversation.clone()));
        let scripted = self.scripted_fetches.borrow_mut().pop_front();
        if let Some((delay, messages)) = scripted {
            pause(delay).await;
            return Ok(messages);
        }
        pause(self.fetch_delay.get()).await;
        Ok(self
            .messages
            .borrow()
            .iter()
            .filter(|m| &m.conversation_id == conversation)
            .cloned()
            .collect())
    }

    async fn upload_media(&self, attachment: &Attachment) -> Result<String, ApiError> {
        self.record(Call::Upload(attachment.file_name.clone()));
        if self.fail_upload.get() {
            return Err(server(500, "Storage unavailable"));
        }
        Ok(format!("https://media.test/{}", attachment.file_name))
    }

    async fn send_message(&self, request: &SendMessageRequest) -> Result<(), ApiError> {
        self.record(Call::Send(request.clone()));
        pause(self.send_delay.get()).await;
        if self.fail_send.get() {
            return Err(server(400, "Send rejected"));
        }
        let message = self.message(
            request.sender_id.clone(),
            request.content.clone(),
            request.media_url.iter().cloned().collect(),
        );
        self.messages.borrow_mut().push(message);
        Ok(())
    }

    async fn delete_message(&self, message: &MessageId) -> Result<(), ApiError> {
        self.record(Call::Delete(message.clone()));
        if self.fail_delete.get() {
            return Err(server(500, "Delete failed"));
        }
        self.messages.borrow_mut().retain(|m| &m.id != message);
        Ok(())
    }

    async fn user_name(&self, user: &UserId) -> Result<String, ApiError> {
        self.record(Call::Name(user.clone()));
        self.names
            .borrow()
            .get(user)
            .cloned()
            .ok_or_else(|| server(404, "User not found"))
    }
}
