//! In-memory development backend for the Bazaar front end.
//!
//! Implements the marketplace REST endpoints the UI talks to. Nothing is
//! persisted. The bearer token is taken to be the caller's user id, which is
//! enough to enforce message ownership on delete.

mod error;
mod store;

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, HOST};
use axum::http::{HeaderMap, Method};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};

use bazaar_common::chat::{
    Ack, ConversationKey, SendMessageRequest, StartConversationResponse, UploadResponse,
    UserNameResponse, MEDIA_FIELD,
};
use bazaar_common::ids::{ConversationId, MessageId, UserId};
use bazaar_common::message::Message;
use bazaar_common::product::Product;

pub use error::ApiError;
pub use store::{Seed, SeedUser, Store, StoredMedia};

pub struct AppState {
    store: RwLock<Store>,
}

impl AppState {
    pub fn new(seed: Seed) -> Arc<Self> {
        Arc::new(Self {
            store: RwLock::new(Store::new(seed)),
        })
    }
}

/// The authenticated user: the bearer token, verbatim.
fn caller(headers: &HeaderMap) -> Option<UserId> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(UserId::new)
}

// ─── Handlers ────────────────────────────────────────────────────────────────

async fn start_handler(
    State(state): State<Arc<AppState>>,
    Json(key): Json<ConversationKey>,
) -> Result<Json<StartConversationResponse>, ApiError> {
    let conversation_id = state.store.write().await.start_conversation(key)?;
    Ok(Json(StartConversationResponse { conversation_id }))
}

async fn messages_handler(
    State(state): State<Arc<AppState>>,
    Path(conversation): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let messages = state
        .store
        .read()
        .await
        .messages(&ConversationId::new(conversation))?;
    Ok(Json(messages))
}

async fn send_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<Message>, ApiError> {
    let caller = caller(&headers);
    let message = state.store.write().await.send(caller.as_ref(), request)?;
    tracing::info!(message = %message.id, conversation = %message.conversation_id, "message stored");
    Ok(Json(message))
}

async fn delete_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Ack>, ApiError> {
    let caller = caller(&headers);
    let id = MessageId::new(id);
    state.store.write().await.delete(caller.as_ref(), &id)?;
    tracing::info!(message = %id, "message deleted");
    Ok(Json(Ack {
        message: Some("Message deleted".into()),
    }))
}

async fn upload_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let bad_form = |e: axum::extract::multipart::MultipartError| ApiError::BadRequest(e.body_text());

    let mut media = None;
    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        if field.name() != Some(MEDIA_FIELD) {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(bad_form)?;
        media = Some(StoredMedia {
            content_type,
            bytes: bytes.to_vec(),
        });
    }
    let media = media.ok_or_else(|| ApiError::BadRequest(format!("Missing '{MEDIA_FIELD}' field")))?;

    let id = state.store.write().await.put_media(media)?;
    let host = headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    Ok(Json(UploadResponse {
        url: format!("http://{host}/media/{id}"),
    }))
}

async fn media_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.read().await;
    let media = store.media(&id)?;
    Ok(([(CONTENT_TYPE, media.content_type.clone())], media.bytes.clone()))
}

async fn user_name_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UserNameResponse>, ApiError> {
    let store = state.store.read().await;
    let name = store.user_name(&UserId::new(id))?.to_string();
    Ok(Json(UserNameResponse { name }))
}

async fn products_handler(State(state): State<Arc<AppState>>) -> Json<Vec<Product>> {
    Json(state.store.read().await.products().to_vec())
}

// ─── Router ──────────────────────────────────────────────────────────────────

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/messages/start", post(start_handler))
        .route("/messages/send", post(send_handler))
        .route("/messages/{id}", get(messages_handler).delete(delete_handler))
        .route("/uploadImage/uploadMessageMedia", post(upload_handler))
        .route("/media/{id}", get(media_handler))
        .route("/users/getName/{id}", get(user_name_handler))
        .route("/products", get(products_handler))
        .layer(cors)
        .with_state(state)
}

/// Serve until the listener fails.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    axum::serve(listener, router(state)).await
}
