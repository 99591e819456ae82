//! A chat session driving the real HTTP client against the dev backend.

use bazaar_common::chat::ConversationKey;
use bazaar_dev_api::{serve, AppState, Seed, SeedUser};
use bazaar_ui::api::{ApiError, ChatBackend, HttpClient};
use bazaar_ui::chat::draft::TrackedPreviews;
use bazaar_ui::chat::{Attachment, ChatError, ChatSession, DeleteOutcome, Phase, SessionContext};
use tokio::net::TcpListener;

async fn spawn_api() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seed = Seed {
        users: vec![
            SeedUser {
                id: "buyer".into(),
                name: "Nadia".into(),
            },
            SeedUser {
                id: "seller".into(),
                name: "Karim Store".into(),
            },
        ],
        products: Vec::new(),
    };
    tokio::spawn(serve(listener, AppState::new(seed)));
    format!("http://{addr}")
}

fn session(base: &str, user: &str) -> ChatSession<HttpClient> {
    let client = HttpClient::new(base).with_token(Some(user.to_string()));
    ChatSession::new(
        client,
        SessionContext::new(user.into()),
        Box::new(TrackedPreviews::new()),
    )
}

fn key() -> ConversationKey {
    ConversationKey::new("p1".into(), "buyer".into(), "seller".into())
}

#[tokio::test]
async fn buyer_and_seller_converse() {
    let base = spawn_api().await;
    let buyer = session(&base, "buyer");
    let seller = session(&base, "seller");

    let id = buyer.initialize(key(), None).await.unwrap();
    assert_eq!(buyer.phase(), Phase::Active);
    // The seller reaches the same conversation through the same triple.
    assert_eq!(seller.initialize(key(), None).await.unwrap(), id);

    buyer.set_draft_text("  Is the bicycle still for sale?  ");
    buyer.send().await.unwrap();
    assert_eq!(buyer.draft_text(), "");

    seller.refresh().await.unwrap();
    let seen = seller.messages();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].content, "Is the bicycle still for sale?");

    seller.load_participant_names().await;
    let rows = seller.message_views(None);
    assert_eq!(rows[0].sender, "Nadia");
    assert!(!rows[0].can_delete);
}

#[tokio::test]
async fn image_only_message_round_trips() {
    let base = spawn_api().await;
    let buyer = session(&base, "buyer");
    buyer.initialize(key(), None).await.unwrap();

    buyer.select_attachment(Attachment::new("bike.png", "image/png", vec![1, 2, 3, 4]));
    buyer.send().await.unwrap();

    let messages = buyer.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "");
    assert_eq!(messages[0].media_urls.len(), 1);
    assert!(messages[0].media_urls[0].contains("/media/"));
    assert!(buyer.attachment_name().is_none());
}

#[tokio::test]
async fn rejected_upload_posts_nothing() {
    let base = spawn_api().await;
    let buyer = session(&base, "buyer");
    buyer.initialize(key(), None).await.unwrap();

    buyer.set_draft_text("see attached");
    buyer.select_attachment(Attachment::new("notes.txt", "text/plain", b"hi".to_vec()));
    let err = buyer.send().await.unwrap_err();
    assert!(matches!(err, ChatError::Upload(_)));
    assert_eq!(
        buyer.error().as_deref(),
        Some("Image upload failed: Only images can be uploaded")
    );

    buyer.refresh().await.unwrap();
    assert!(buyer.messages().is_empty());
    assert_eq!(buyer.draft_text(), "see attached");
}

#[tokio::test]
async fn only_the_author_deletes() {
    let base = spawn_api().await;
    let buyer = session(&base, "buyer");
    buyer.initialize(key(), None).await.unwrap();
    buyer.set_draft_text("wrong chat, sorry");
    buyer.send().await.unwrap();
    let id = buyer.messages()[0].id.clone();

    // Bypassing the client-side check, the backend still refuses.
    let seller_client = HttpClient::new(&base).with_token(Some("seller".into()));
    let err = seller_client.delete_message(&id).await.unwrap_err();
    assert_eq!(
        err,
        ApiError::Server {
            status: 403,
            message: "You can only delete your own messages".into(),
        }
    );

    let outcome = buyer.delete_message(&id, || true).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert!(buyer.messages().is_empty());
}
