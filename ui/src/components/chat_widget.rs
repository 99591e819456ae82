use dioxus::prelude::*;

use bazaar_common::ids::{MessageId, UserId};

use super::shared_state::{use_shared_state, ChatTarget};
use crate::api::HttpClient;
use crate::chat::{
    platform_previews, Attachment, ChatSession, KeyAction, KeyPress, MessageView, PanelChrome,
    Point, SessionContext,
};

type Session = ChatSession<HttpClient>;

/// Ask before deleting. Off-browser there is nobody to ask, so the answer is no.
fn confirm_delete() -> bool {
    const PROMPT: &str = "Delete this message?";
    #[cfg(target_family = "wasm")]
    {
        web_sys::window()
            .and_then(|w| w.confirm_with_message(PROMPT).ok())
            .unwrap_or(false)
    }
    #[cfg(not(target_family = "wasm"))]
    {
        tracing::warn!("{PROMPT} no confirmation available, keeping the message");
        false
    }
}

/// MIME type from the file extension. The upload endpoint only takes images.
fn image_mime(file_name: &str) -> Option<&'static str> {
    let ext = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

fn key_press(evt: &KeyboardEvent) -> KeyPress {
    match evt.key() {
        Key::Enter => KeyPress::Enter {
            shift: evt.modifiers().shift(),
        },
        Key::Escape => KeyPress::Escape,
        _ => KeyPress::Other,
    }
}

fn pointer(evt: &MouseEvent) -> Point {
    let p = evt.client_coordinates();
    Point::new(p.x, p.y)
}

/// Floating, draggable chat panel for one buyer/seller conversation.
#[component]
pub fn ChatWidget(target: ChatTarget, viewer: UserId, on_close: EventHandler<()>) -> Element {
    let shared = use_shared_state();
    let mut revision = use_signal(|| 0u64);
    let mut chrome = use_signal(PanelChrome::default);

    let session: Session = use_hook(|| {
        let api = shared.peek().api.clone();
        let session = ChatSession::new(api, SessionContext::new(viewer.clone()), platform_previews());
        session.set_observer(move || {
            let mut revision = revision;
            *revision.write() += 1;
        });
        session
    });

    use_hook({
        let session = session.clone();
        let target = target.clone();
        move || {
            let interval = shared.peek().config.poll_interval();
            let opener = session.clone();
            spawn(async move {
                if opener.initialize(target.key, target.existing).await.is_ok() {
                    opener.load_participant_names().await;
                }
            });
            spawn(session.start_polling(interval));
        }
    });

    use_drop({
        let session = session.clone();
        move || {
            session.set_observer(|| {});
            session.close();
        }
    });

    // Re-render whenever the session reports a change.
    let _ = revision.read();

    let close = {
        let session = session.clone();
        move || {
            session.close();
            on_close.call(());
        }
    };

    let send = {
        let session = session.clone();
        move || {
            let session = session.clone();
            spawn(async move {
                // A send may be what finally starts the conversation.
                if session.send().await.is_ok() {
                    session.load_participant_names().await;
                }
            });
        }
    };

    let panel = chrome.read();
    let position = panel.position();
    let size = panel.size();
    let dragging = panel.is_dragging();
    let views = session.message_views(panel.hovered());
    drop(panel);

    let counterpart = target
        .key
        .counterpart(&viewer)
        .map(|u| session.label_for(u))
        .unwrap_or_default();
    let error = session.error();
    let sending = session.is_sending();
    let draft = session.draft_text();
    let attachment = session.attachment_name().zip(session.attachment_preview());

    rsx! {
        // Pointer-down anywhere outside the panel closes it.
        div {
            class: "chat-backdrop",
            onmousedown: {
                let close = close.clone();
                move |evt: MouseEvent| {
                    if chrome.peek().should_dismiss(pointer(&evt)) {
                        close();
                    }
                }
            },
        }

        // Only present mid-drag, so move/up tracking costs nothing otherwise.
        if dragging {
            div {
                class: "chat-drag-layer",
                onmousemove: move |evt| {
                    chrome.write().drag_to(pointer(&evt));
                },
                onmouseup: move |_| chrome.write().end_drag(),
            }
        }

        div {
            class: "chat-widget",
            style: "left: {position.x}px; top: {position.y}px; width: {size.width}px; height: {size.height}px;",

            div {
                class: "chat-header",
                onmousedown: move |evt| {
                    evt.stop_propagation();
                    chrome.write().begin_drag(pointer(&evt));
                },
                div { class: "chat-title",
                    strong { "{target.product_title}" }
                    if !counterpart.is_empty() {
                        span { class: "chat-peer", " with {counterpart}" }
                    }
                }
                button {
                    class: "chat-close-btn",
                    onmousedown: move |evt| evt.stop_propagation(),
                    onclick: {
                        let close = close.clone();
                        move |_| close()
                    },
                    "×"
                }
            }

            div { class: "chat-messages",
                if views.is_empty() {
                    p { class: "chat-empty", "No messages yet. Say hello!" }
                }
                for view in views {
                    MessageRow {
                        key: "{view.id}",
                        view: view.clone(),
                        session: session.clone(),
                        on_hover: move |hovered: Option<MessageId>| chrome.write().hover(hovered),
                    }
                }
            }

            if let Some(err) = error {
                p { class: "chat-error", "{err}" }
            }

            if let Some((name, preview)) = attachment {
                div { class: "chat-attachment",
                    img { src: "{preview.as_str()}", alt: "{name}" }
                    span { "{name}" }
                    button {
                        disabled: sending,
                        onclick: {
                            let session = session.clone();
                            move |_| session.clear_attachment()
                        },
                        "Remove"
                    }
                }
            }

            div { class: "chat-compose",
                label { class: "chat-attach-btn",
                    "📎"
                    input {
                        r#type: "file",
                        accept: "image/*",
                        disabled: sending,
                        style: "display: none;",
                        onchange: {
                            let session = session.clone();
                            move |evt: FormEvent| {
                                let session = session.clone();
                                spawn(async move {
                                    let Some(file) = evt.files().into_iter().next() else {
                                        return;
                                    };
                                    let name = file.name();
                                    let Some(mime) = image_mime(&name) else {
                                        tracing::warn!(file = %name, "not an image, ignoring");
                                        return;
                                    };
                                    match file.read_bytes().await {
                                        Ok(bytes) => session.select_attachment(Attachment::new(name, mime, bytes.to_vec())),
                                        Err(e) => tracing::warn!(file = %name, "could not read file: {e}"),
                                    }
                                });
                            }
                        },
                    }
                }
                textarea {
                    placeholder: "Type a message...",
                    value: "{draft}",
                    disabled: sending,
                    oninput: {
                        let session = session.clone();
                        move |evt: FormEvent| session.set_draft_text(evt.value())
                    },
                    onkeydown: {
                        let close = close.clone();
                        let send = send.clone();
                        move |evt: KeyboardEvent| {
                            let action = chrome.peek().on_key(key_press(&evt));
                            if action.prevents_default() {
                                evt.prevent_default();
                            }
                            match action {
                                KeyAction::Send => send(),
                                KeyAction::Close => close(),
                                KeyAction::Default => {}
                            }
                        }
                    },
                }
                button {
                    class: "chat-send-btn",
                    disabled: sending,
                    onclick: move |_| send(),
                    if sending { "Sending..." } else { "Send" }
                }
            }
        }
    }
}

#[component]
fn MessageRow(view: MessageView, session: Session, on_hover: EventHandler<Option<MessageId>>) -> Element {
    let class = if view.mine { "chat-msg mine" } else { "chat-msg theirs" };
    let enter_id = view.id.clone();
    let delete_id = view.id.clone();

    rsx! {
        div {
            class: "{class}",
            onmouseenter: move |_| on_hover.call(Some(enter_id.clone())),
            onmouseleave: move |_| on_hover.call(None),
            div { class: "chat-msg-meta",
                span { class: "chat-msg-sender", "{view.sender}" }
                span { class: "chat-msg-time", "{view.time}" }
            }
            if !view.content.is_empty() {
                p { class: "chat-msg-text", "{view.content}" }
            }
            for url in view.media_urls.iter() {
                img { key: "{url}", class: "chat-msg-media", src: "{url}" }
            }
            if view.show_delete {
                button {
                    class: "chat-msg-delete",
                    onclick: move |_| {
                        let session = session.clone();
                        let id = delete_id.clone();
                        spawn(async move {
                            let _ = session.delete_message(&id, confirm_delete).await;
                        });
                    },
                    "Delete"
                }
            }
        }
    }
}
