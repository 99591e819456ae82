use dioxus::prelude::*;

use bazaar_common::chat::ConversationKey;
use bazaar_common::ids::{ConversationId, UserId};
use bazaar_common::product::Product;

use crate::api::{GeoClient, HttpClient};
use crate::config::ClientConfig;

/// What the floating chat panel is open on.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatTarget {
    pub key: ConversationKey,
    /// Set when reopening a conversation whose id is already known.
    pub existing: Option<ConversationId>,
    pub product_title: String,
}

impl ChatTarget {
    /// The buyer side of a chat about `product`. `None` for the seller's own
    /// listings.
    pub fn for_product(product: &Product, viewer: &UserId) -> Option<Self> {
        if &product.seller_id == viewer {
            return None;
        }
        Some(Self {
            key: ConversationKey::new(
                product.id.clone(),
                viewer.clone(),
                product.seller_id.clone(),
            ),
            existing: None,
            product_title: product.title.clone(),
        })
    }
}

/// Backend-sourced state shared across all components.
#[derive(Clone, Debug)]
pub struct SharedState {
    pub config: ClientConfig,
    pub api: HttpClient,
    pub geo: GeoClient,
    /// Every listing, as last fetched.
    pub products: Vec<Product>,
    pub loading: bool,
    /// Last error message from the backend.
    pub last_error: Option<String>,
    pub open_chat: Option<ChatTarget>,
}

impl SharedState {
    pub fn new(config: ClientConfig, token: Option<String>) -> Self {
        Self {
            api: HttpClient::new(config.api_url.clone()).with_token(token),
            geo: GeoClient::new(config.geo_url.clone()),
            config,
            products: Vec::new(),
            loading: true,
            last_error: None,
            open_chat: None,
        }
    }
}

pub fn use_shared_state() -> Signal<SharedState> {
    use_context::<Signal<SharedState>>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_common::address::Address;

    fn product(seller: &str) -> Product {
        Product {
            id: "p1".into(),
            seller_id: seller.into(),
            title: "Rickshaw bell".into(),
            description: String::new(),
            category: "Bicycles".into(),
            price: 250,
            images: Vec::new(),
            address: Address::default(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn buyer_chats_with_seller() {
        let target = ChatTarget::for_product(&product("seller"), &"buyer".into()).unwrap();
        assert_eq!(target.key.buyer_id, UserId::new("buyer"));
        assert_eq!(target.key.seller_id, UserId::new("seller"));
        assert_eq!(target.product_title, "Rickshaw bell");
        assert!(target.existing.is_none());
    }

    #[test]
    fn no_chat_on_own_listing() {
        assert!(ChatTarget::for_product(&product("me"), &"me".into()).is_none());
    }
}
