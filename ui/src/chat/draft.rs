//! Composition state: pending text plus at most one image attachment.

use std::collections::HashSet;

/// An image picked by the user, held in memory until sent or removed.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Handle to a locally generated preview (an object URL in the browser).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewRef(pub String);

impl PreviewRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Creates and releases attachment previews.
///
/// Every [`PreviewRef`] handed out by `create` must eventually be passed to
/// `release` exactly once.
pub trait PreviewStore {
    fn create(&mut self, attachment: &Attachment) -> PreviewRef;
    fn release(&mut self, preview: &PreviewRef);
}

/// Preview store that only tracks handles. Used off-browser and in tests.
#[derive(Debug, Default)]
pub struct TrackedPreviews {
    live: HashSet<PreviewRef>,
    next: u64,
}

impl TrackedPreviews {
    pub fn new() -> Self {
        Self::default()
    }

    /// Previews created but not yet released.
    pub fn live(&self) -> usize {
        self.live.len()
    }
}

impl PreviewStore for TrackedPreviews {
    fn create(&mut self, attachment: &Attachment) -> PreviewRef {
        self.next += 1;
        let preview = PreviewRef(format!("preview:{}/{}", self.next, attachment.file_name));
        self.live.insert(preview.clone());
        preview
    }

    fn release(&mut self, preview: &PreviewRef) {
        if !self.live.remove(preview) {
            tracing::debug!(preview = preview.as_str(), "released unknown preview");
        }
    }
}

/// Object-URL previews backed by `URL.createObjectURL`.
#[cfg(target_family = "wasm")]
#[derive(Debug, Default)]
pub struct ObjectUrlPreviews;

#[cfg(target_family = "wasm")]
impl PreviewStore for ObjectUrlPreviews {
    fn create(&mut self, attachment: &Attachment) -> PreviewRef {
        let bytes = js_sys::Uint8Array::from(attachment.bytes.as_slice());
        let parts = js_sys::Array::of1(&bytes);
        let options = web_sys::BlobPropertyBag::new();
        options.set_type(&attachment.mime_type);
        let url = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &options)
            .and_then(|blob| web_sys::Url::create_object_url_with_blob(&blob))
            .unwrap_or_else(|e| {
                tracing::warn!("preview creation failed: {:?}", e);
                String::new()
            });
        PreviewRef(url)
    }

    fn release(&mut self, preview: &PreviewRef) {
        if !preview.0.is_empty() {
            let _ = web_sys::Url::revoke_object_url(&preview.0);
        }
    }
}

/// The store the current platform should use.
pub fn platform_previews() -> Box<dyn PreviewStore> {
    #[cfg(target_family = "wasm")]
    {
        Box::new(ObjectUrlPreviews)
    }
    #[cfg(not(target_family = "wasm"))]
    {
        Box::new(TrackedPreviews::new())
    }
}

/// Not-yet-sent message. Never persisted.
#[derive(Debug, Default)]
pub struct Draft {
    text: String,
    attachment: Option<(Attachment, PreviewRef)>,
}

impl Draft {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref().map(|(a, _)| a)
    }

    pub fn preview(&self) -> Option<&PreviewRef> {
        self.attachment.as_ref().map(|(_, p)| p)
    }

    /// Nothing to send: blank text and no attachment.
    pub fn is_empty(&self) -> bool {
        self.trimmed_text().is_empty() && self.attachment.is_none()
    }

    /// Replace any pending attachment, releasing its preview first.
    pub fn select_attachment(&mut self, attachment: Attachment, previews: &mut dyn PreviewStore) {
        self.clear_attachment(previews);
        let preview = previews.create(&attachment);
        self.attachment = Some((attachment, preview));
    }

    pub fn clear_attachment(&mut self, previews: &mut dyn PreviewStore) {
        if let Some((_, preview)) = self.attachment.take() {
            previews.release(&preview);
        }
    }

    /// Drop text and attachment.
    pub fn clear(&mut self, previews: &mut dyn PreviewStore) {
        self.text.clear();
        self.clear_attachment(previews);
    }
}
