//! Live view of one buyer/seller conversation.
//!
//! A [`ChatSession`] resolves the conversation id, keeps the message list in
//! sync by polling, and sends or deletes messages. All state sits behind a
//! `RefCell` that is never borrowed across an `.await`: the session lives on
//! a single event loop, but its operations interleave at every network call.
//!
//! Every fetch is tagged with a sequence number and a response older than
//! the newest applied one is dropped, so overlapping polls cannot roll the
//! list back. Once closed, completions of in-flight requests are ignored.

use std::cell::RefCell;
use std::future::Future;
use std::rc::{Rc, Weak};
use std::time::Duration;

use futures::channel::oneshot;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};

use bazaar_common::chat::{ConversationKey, SendMessageRequest};
use bazaar_common::ids::{ConversationId, MessageId, UserId};
use bazaar_common::message::Message;

use super::draft::{Attachment, Draft, PreviewRef, PreviewStore};
use super::error::ChatError;
use super::names::NameDirectory;
use crate::api::ChatBackend;
use crate::timer;

/// Who is looking at the panel. Passed in once, never looked up mid-operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub viewer: UserId,
}

impl SessionContext {
    pub fn new(viewer: UserId) -> Self {
        Self { viewer }
    }
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    ResolvingId,
    Active,
    Sending,
    Deleting,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The user declined the confirmation prompt. Nothing was sent.
    Cancelled,
}

/// One row of the rendered message list.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageView {
    pub id: MessageId,
    pub mine: bool,
    pub sender: String,
    pub content: String,
    pub media_urls: Vec<String>,
    pub time: String,
    /// The viewer authored it and no delete is running.
    pub can_delete: bool,
    /// `can_delete` and the row is hovered.
    pub show_delete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Uninitialized,
    Resolving,
    Ready,
    Closed,
}

struct State {
    lifecycle: Lifecycle,
    key: Option<ConversationKey>,
    conversation: Option<ConversationId>,
    messages: Vec<Message>,
    draft: Draft,
    sending: bool,
    deleting: Option<MessageId>,
    error: Option<String>,
    names: NameDirectory,
    /// Sequence number of the newest fetch issued.
    issued: u64,
    /// Sequence number of the fetch whose result is on screen.
    applied: u64,
    poll_cancel: Option<oneshot::Sender<()>>,
}

impl State {
    fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Uninitialized,
            key: None,
            conversation: None,
            messages: Vec::new(),
            draft: Draft::default(),
            sending: false,
            deleting: None,
            error: None,
            names: NameDirectory::default(),
            issued: 0,
            applied: 0,
            poll_cancel: None,
        }
    }

    fn is_closed(&self) -> bool {
        self.lifecycle == Lifecycle::Closed
    }
}

struct Inner<B> {
    backend: B,
    ctx: SessionContext,
    state: RefCell<State>,
    previews: RefCell<Box<dyn PreviewStore>>,
    observer: RefCell<Option<Rc<dyn Fn()>>>,
}

impl<B> Drop for Inner<B> {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        state.draft.clear(&mut **self.previews.get_mut());
        if let Some(cancel) = state.poll_cancel.take() {
            let _ = cancel.send(());
        }
    }
}

/// Handle to a chat session. Clones share the same session.
pub struct ChatSession<B> {
    inner: Rc<Inner<B>>,
}

impl<B> Clone for ChatSession<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<B> PartialEq for ChatSession<B> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<B: ChatBackend + 'static> ChatSession<B> {
    pub fn new(backend: B, ctx: SessionContext, previews: Box<dyn PreviewStore>) -> Self {
        Self {
            inner: Rc::new(Inner {
                backend,
                ctx,
                state: RefCell::new(State::new()),
                previews: RefCell::new(previews),
                observer: RefCell::new(None),
            }),
        }
    }

    // ---------- Accessors ----------

    pub fn viewer(&self) -> &UserId {
        &self.inner.ctx.viewer
    }

    pub fn phase(&self) -> Phase {
        let st = self.inner.state.borrow();
        match st.lifecycle {
            Lifecycle::Closed => Phase::Closed,
            Lifecycle::Uninitialized => Phase::Uninitialized,
            Lifecycle::Resolving => Phase::ResolvingId,
            Lifecycle::Ready if st.sending => Phase::Sending,
            Lifecycle::Ready if st.deleting.is_some() => Phase::Deleting,
            Lifecycle::Ready => Phase::Active,
        }
    }

    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.inner.state.borrow().conversation.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.inner.state.borrow().messages.clone()
    }

    /// Last error worth showing to the user, if any.
    pub fn error(&self) -> Option<String> {
        self.inner.state.borrow().error.clone()
    }

    pub fn is_sending(&self) -> bool {
        self.inner.state.borrow().sending
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.borrow().is_closed()
    }

    pub fn draft_text(&self) -> String {
        self.inner.state.borrow().draft.text().to_string()
    }

    pub fn attachment_name(&self) -> Option<String> {
        let st = self.inner.state.borrow();
        st.draft.attachment().map(|a| a.file_name.clone())
    }

    pub fn attachment_preview(&self) -> Option<PreviewRef> {
        self.inner.state.borrow().draft.preview().cloned()
    }

    /// Register a callback fired after every state change. Replaces any
    /// previous observer.
    pub fn set_observer(&self, observer: impl Fn() + 'static) {
        *self.inner.observer.borrow_mut() = Some(Rc::new(observer));
    }

    fn notify(&self) {
        let observer = self.inner.observer.borrow().clone();
        if let Some(observer) = observer {
            observer();
        }
    }

    // ---------- Draft ----------

    /// Ignored while a send is in flight; the input is disabled then.
    pub fn set_draft_text(&self, text: impl Into<String>) {
        {
            let mut st = self.inner.state.borrow_mut();
            if st.sending || st.is_closed() {
                return;
            }
            st.draft.set_text(text);
        }
        self.notify();
    }

    /// Hold `attachment` as the single pending image, releasing the
    /// preview of any image it replaces.
    pub fn select_attachment(&self, attachment: Attachment) {
        {
            let mut st = self.inner.state.borrow_mut();
            if st.sending || st.is_closed() {
                return;
            }
            let mut previews = self.inner.previews.borrow_mut();
            st.draft.select_attachment(attachment, &mut **previews);
        }
        self.notify();
    }

    pub fn clear_attachment(&self) {
        {
            let mut st = self.inner.state.borrow_mut();
            if st.sending {
                return;
            }
            let mut previews = self.inner.previews.borrow_mut();
            st.draft.clear_attachment(&mut **previews);
        }
        self.notify();
    }

    // ---------- Conversation ----------

    /// Adopt `existing`, or get-or-create the conversation for `key`.
    ///
    /// Re-entry once an id is held returns it without another request.
    /// On failure the session goes back to `Uninitialized`; fetching stays
    /// impossible until a later call succeeds.
    pub async fn initialize(
        &self,
        key: ConversationKey,
        existing: Option<ConversationId>,
    ) -> Result<ConversationId, ChatError> {
        {
            let mut st = self.inner.state.borrow_mut();
            match st.lifecycle {
                Lifecycle::Closed => return Err(ChatError::Closed),
                Lifecycle::Resolving => return Err(ChatError::Resolving),
                Lifecycle::Uninitialized | Lifecycle::Ready => {}
            }
            st.key = Some(key.clone());
            if let Some(id) = st.conversation.clone() {
                return Ok(id);
            }
            if let Some(id) = existing {
                tracing::info!(conversation = %id, "adopted existing conversation");
                st.conversation = Some(id.clone());
                st.lifecycle = Lifecycle::Ready;
                drop(st);
                self.notify();
                return Ok(id);
            }
            st.lifecycle = Lifecycle::Resolving;
        }
        self.notify();

        let result = self.inner.backend.start_conversation(&key).await;

        let outcome = {
            let mut st = self.inner.state.borrow_mut();
            if st.is_closed() {
                return Err(ChatError::Closed);
            }
            match result {
                Ok(id) => {
                    tracing::info!(conversation = %id, product = %key.product_id, "conversation resolved");
                    st.conversation = Some(id.clone());
                    st.lifecycle = Lifecycle::Ready;
                    st.error = None;
                    Ok(id)
                }
                Err(e) => {
                    tracing::warn!(product = %key.product_id, "failed to start conversation: {e}");
                    st.lifecycle = Lifecycle::Uninitialized;
                    st.error = Some(e.user_message());
                    Err(ChatError::Api(e))
                }
            }
        };
        self.notify();
        outcome
    }

    /// Fetch the full message list and replace the local copy.
    pub async fn refresh(&self) -> Result<(), ChatError> {
        let (conversation, seq) = {
            let mut st = self.inner.state.borrow_mut();
            if st.is_closed() {
                return Err(ChatError::Closed);
            }
            let Some(conversation) = st.conversation.clone() else {
                return Err(ChatError::NoConversation);
            };
            st.issued += 1;
            (conversation, st.issued)
        };

        let result = self.inner.backend.fetch_messages(&conversation).await;

        {
            let mut st = self.inner.state.borrow_mut();
            if st.is_closed() {
                return Err(ChatError::Closed);
            }
            match result {
                Ok(messages) => {
                    if seq < st.applied {
                        tracing::debug!(seq, applied = st.applied, "dropping stale message list");
                        return Ok(());
                    }
                    st.applied = seq;
                    st.messages = messages;
                }
                Err(e) => {
                    tracing::warn!(conversation = %conversation, "failed to fetch messages: {e}");
                    return Err(ChatError::Api(e));
                }
            }
        }
        self.notify();
        Ok(())
    }

    /// The polling loop: fetch now, then every `interval` until the
    /// session closes, is dropped, or a newer loop replaces this one.
    ///
    /// Fetches run alongside the ticker, so a slow response never delays the
    /// next tick. Spawn the returned future on the UI executor.
    pub fn start_polling(&self, interval: Duration) -> impl Future<Output = ()> + 'static {
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        {
            let mut st = self.inner.state.borrow_mut();
            if !st.is_closed() {
                // Dropping the previous sender stops the previous loop.
                st.poll_cancel = Some(cancel_tx);
            }
        }
        let weak: Weak<Inner<B>> = Rc::downgrade(&self.inner);

        async move {
            let mut ticks = Box::pin(timer::ticks(interval)).fuse();
            let mut cancel = cancel_rx.fuse();
            let mut in_flight = FuturesUnordered::new();

            loop {
                futures::select! {
                    tick = ticks.next() => {
                        if tick.is_none() {
                            break;
                        }
                        let Some(inner) = weak.upgrade() else {
                            break;
                        };
                        let session = ChatSession { inner };
                        if session.is_closed() {
                            break;
                        }
                        if session.conversation_id().is_none() {
                            continue;
                        }
                        tracing::debug!("poll tick");
                        in_flight.push(async move {
                            if let Err(e) = session.refresh().await {
                                tracing::debug!("poll fetch failed: {e}");
                            }
                        });
                    }
                    () = in_flight.select_next_some() => {}
                    _ = cancel => break,
                    complete => break,
                }
            }
            tracing::debug!("poll loop stopped");
        }
    }

    /// Send the current draft.
    ///
    /// If an earlier conversation start failed, it is retried first.
    /// Validation failures are reported without touching the network. The
    /// attachment, if any, is uploaded first; if that fails nothing is
    /// posted. On success the draft is cleared and the list re-fetched
    /// right away.
    pub async fn send(&self) -> Result<(), ChatError> {
        if let Some(key) = self.pending_start() {
            tracing::info!(product = %key.product_id, "retrying conversation start before send");
            self.initialize(key, None).await?;
        }

        let (request, attachment) = {
            let mut st = self.inner.state.borrow_mut();
            if st.is_closed() {
                return Err(ChatError::Closed);
            }
            if st.sending {
                return Err(ChatError::SendInFlight);
            }
            let checked = if st.draft.is_empty() {
                Err(ChatError::EmptyMessage)
            } else {
                st.conversation.clone().ok_or(ChatError::NoConversation)
            };
            let conversation_id = match checked {
                Ok(id) => id,
                Err(err) => {
                    st.error = Some(err.user_message());
                    drop(st);
                    self.notify();
                    return Err(err);
                }
            };
            st.sending = true;
            st.error = None;
            let request = SendMessageRequest {
                conversation_id,
                sender_id: self.inner.ctx.viewer.clone(),
                content: st.draft.trimmed_text().to_string(),
                media_url: None,
            };
            (request, st.draft.attachment().cloned())
        };
        self.notify();

        let result = self.post(request, attachment).await;

        {
            let mut st = self.inner.state.borrow_mut();
            if st.is_closed() {
                return Err(ChatError::Closed);
            }
            st.sending = false;
            match &result {
                Ok(()) => {
                    let mut previews = self.inner.previews.borrow_mut();
                    st.draft.clear(&mut **previews);
                }
                Err(e) => {
                    tracing::warn!("send failed: {e}");
                    st.error = Some(e.user_message());
                }
            }
        }
        self.notify();

        if result.is_ok() {
            tracing::info!("message sent");
            // Show the sender their own message without waiting for a tick.
            let _ = self.refresh().await;
        }
        result
    }

    /// The key to start with, when an earlier start failed and a
    /// non-empty draft is waiting on it.
    fn pending_start(&self) -> Option<ConversationKey> {
        let st = self.inner.state.borrow();
        match st.lifecycle {
            Lifecycle::Uninitialized if st.conversation.is_none() && !st.draft.is_empty() => {
                st.key.clone()
            }
            _ => None,
        }
    }

    async fn post(
        &self,
        mut request: SendMessageRequest,
        attachment: Option<Attachment>,
    ) -> Result<(), ChatError> {
        if let Some(attachment) = attachment {
            let url = self
                .inner
                .backend
                .upload_media(&attachment)
                .await
                .map_err(ChatError::Upload)?;
            if self.is_closed() {
                return Err(ChatError::Closed);
            }
            request.media_url = Some(url);
        }
        self.inner.backend.send_message(&request).await?;
        Ok(())
    }

    /// Delete one of the viewer's own messages after `confirm` agrees.
    ///
    /// The ownership check here only mirrors what the UI offers; the
    /// backend enforces it independently. The list is never edited
    /// locally: it changes only through the re-fetch that follows success.
    pub async fn delete_message(
        &self,
        id: &MessageId,
        confirm: impl FnOnce() -> bool,
    ) -> Result<DeleteOutcome, ChatError> {
        {
            let st = self.inner.state.borrow();
            if st.is_closed() {
                return Err(ChatError::Closed);
            }
            if st.deleting.is_some() {
                return Err(ChatError::DeleteInFlight);
            }
            let own = st
                .messages
                .iter()
                .any(|m| &m.id == id && m.is_from(&self.inner.ctx.viewer));
            if !own {
                return Err(ChatError::NotAuthor);
            }
        }

        if !confirm() {
            tracing::debug!(message = %id, "delete cancelled");
            return Ok(DeleteOutcome::Cancelled);
        }

        {
            let mut st = self.inner.state.borrow_mut();
            if st.is_closed() {
                return Err(ChatError::Closed);
            }
            st.deleting = Some(id.clone());
            st.error = None;
        }
        self.notify();

        let result = self.inner.backend.delete_message(id).await;

        {
            let mut st = self.inner.state.borrow_mut();
            if st.is_closed() {
                return Err(ChatError::Closed);
            }
            st.deleting = None;
            if let Err(e) = &result {
                tracing::warn!(message = %id, "delete failed: {e}");
                st.error = Some(e.user_message());
            }
        }
        self.notify();

        result?;
        let _ = self.refresh().await;
        Ok(DeleteOutcome::Deleted)
    }

    /// Resolve display names for the conversation's participants.
    pub async fn load_participant_names(&self) {
        let wanted: Vec<UserId> = {
            let st = self.inner.state.borrow();
            let Some(key) = &st.key else {
                return;
            };
            [&key.buyer_id, &key.seller_id]
                .into_iter()
                .filter(|u| **u != self.inner.ctx.viewer && !st.names.contains(u))
                .cloned()
                .collect()
        };

        for user in wanted {
            match self.inner.backend.user_name(&user).await {
                Ok(name) => {
                    let mut st = self.inner.state.borrow_mut();
                    if st.is_closed() {
                        return;
                    }
                    st.names.insert(user, name);
                }
                Err(e) => tracing::warn!(user = %user, "failed to load user name: {e}"),
            }
        }
        self.notify();
    }

    /// Label for a participant: "You", their name, or a shortened id.
    pub fn label_for(&self, user: &UserId) -> String {
        self.inner
            .state
            .borrow()
            .names
            .label(user, &self.inner.ctx.viewer)
    }

    /// Rows for rendering. The delete affordance is only ever offered on
    /// the viewer's own messages, and only shown on the hovered row.
    pub fn message_views(&self, hovered: Option<&MessageId>) -> Vec<MessageView> {
        let st = self.inner.state.borrow();
        let viewer = &self.inner.ctx.viewer;
        st.messages
            .iter()
            .map(|m| {
                let mine = m.is_from(viewer);
                let can_delete = mine && st.deleting.is_none() && !st.is_closed();
                MessageView {
                    id: m.id.clone(),
                    mine,
                    sender: st.names.label(&m.sender_id, viewer),
                    content: m.content.clone(),
                    media_urls: m.media_urls.clone(),
                    time: m
                        .sent_at
                        .with_timezone(&chrono::Local)
                        .format("%H:%M")
                        .to_string(),
                    can_delete,
                    show_delete: can_delete && hovered == Some(&m.id),
                }
            })
            .collect()
    }

    /// Terminal. Stops polling, releases the attachment preview, and turns
    /// every later completion into a no-op.
    pub fn close(&self) {
        {
            let mut st = self.inner.state.borrow_mut();
            if st.is_closed() {
                return;
            }
            st.lifecycle = Lifecycle::Closed;
            if let Some(cancel) = st.poll_cancel.take() {
                let _ = cancel.send(());
            }
            let mut previews = self.inner.previews.borrow_mut();
            st.draft.clear(&mut **previews);
            st.sending = false;
            st.deleting = None;
        }
        tracing::debug!("chat session closed");
        self.notify();
    }
}
