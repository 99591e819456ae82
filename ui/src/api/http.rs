use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;

use bazaar_common::chat::{
    ConversationKey, ErrorBody, SendMessageRequest, StartConversationResponse, UploadResponse,
    UserNameResponse, MEDIA_FIELD,
};
use bazaar_common::ids::{ConversationId, MessageId, UserId};
use bazaar_common::message::Message;
use bazaar_common::product::Product;

use super::{encode_segment, ApiError, ChatBackend};
use crate::chat::draft::Attachment;

/// reqwest client for the marketplace REST backend.
#[derive(Clone, Debug)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` on every request.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /products`.
    pub async fn products(&self) -> Result<Vec<Product>, ApiError> {
        let resp = self.authed(self.http.get(self.url("/products"))).send().await?;
        decode(resp).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

impl ChatBackend for HttpClient {
    async fn start_conversation(&self, key: &ConversationKey) -> Result<ConversationId, ApiError> {
        let resp = self
            .authed(self.http.post(self.url("/messages/start")))
            .json(key)
            .send()
            .await?;
        let body: StartConversationResponse = decode(resp).await?;
        Ok(body.conversation_id)
    }

    async fn fetch_messages(&self, conversation: &ConversationId) -> Result<Vec<Message>, ApiError> {
        let url = self.url(&format!("/messages/{}", encode_segment(conversation.as_str())));
        let resp = self.authed(self.http.get(url)).send().await?;
        decode(resp).await
    }

    async fn upload_media(&self, attachment: &Attachment) -> Result<String, ApiError> {
        let part = Part::bytes(attachment.bytes.clone())
            .file_name(attachment.file_name.clone())
            .mime_str(&attachment.mime_type)?;
        let form = Form::new().part(MEDIA_FIELD, part);
        let resp = self
            .authed(self.http.post(self.url("/uploadImage/uploadMessageMedia")))
            .multipart(form)
            .send()
            .await?;
        let body: UploadResponse = decode(resp).await?;
        if body.url.is_empty() {
            return Err(ApiError::Decode("upload returned an empty url".into()));
        }
        Ok(body.url)
    }

    async fn send_message(&self, request: &SendMessageRequest) -> Result<(), ApiError> {
        let resp = self
            .authed(self.http.post(self.url("/messages/send")))
            .json(request)
            .send()
            .await?;
        expect_success(resp).await
    }

    async fn delete_message(&self, message: &MessageId) -> Result<(), ApiError> {
        let url = self.url(&format!("/messages/{}", encode_segment(message.as_str())));
        let resp = self.authed(self.http.delete(url)).send().await?;
        expect_success(resp).await
    }

    async fn user_name(&self, user: &UserId) -> Result<String, ApiError> {
        let url = self.url(&format!("/users/getName/{}", encode_segment(user.as_str())));
        let resp = self.authed(self.http.get(url)).send().await?;
        let body: UserNameResponse = decode(resp).await?;
        Ok(body.name)
    }
}

/// Turn a non-2xx response into [`ApiError::Server`], preferring the
/// body's `error` field.
fn server_error(status: u16, body: &str) -> ApiError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_default();
    ApiError::Server { status, message }
}

pub(super) async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        return Err(server_error(status.as_u16(), &text));
    }
    serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
}

async fn expect_success(resp: Response) -> Result<(), ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let text = resp.text().await.unwrap_or_default();
    Err(server_error(status.as_u16(), &text))
}
