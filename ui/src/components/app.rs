use dioxus::prelude::*;

use bazaar_common::ids::ProductId;

use super::chat_widget::ChatWidget;
use super::listing_view::{ListingView, ProductView};
use super::shared_state::{use_shared_state, SharedState};
use super::user_state::{use_user_state, UserState};
use crate::config::ClientConfig;

#[derive(Clone, Debug, PartialEq, Routable)]
pub enum Route {
    #[layout(AppLayout)]
    #[route("/")]
    Listings {},
    #[route("/product/:id")]
    Product { id: String },
}

#[component]
pub fn App() -> Element {
    let user = use_context_provider(|| Signal::new(UserState::load()));
    use_context_provider(|| {
        let token = user.peek().token();
        Signal::new(SharedState::new(ClientConfig::from_env(), token))
    });
    use_product_loader();

    rsx! { Router::<Route> {} }
}

/// Fetch the listings once at startup.
fn use_product_loader() {
    let mut shared = use_shared_state();
    use_hook(move || {
        spawn(async move {
            let api = shared.peek().api.clone();
            let result = api.products().await;
            let mut state = shared.write();
            state.loading = false;
            match result {
                Ok(products) => {
                    tracing::info!(count = products.len(), "listings loaded");
                    state.products = products;
                }
                Err(e) => {
                    tracing::warn!("failed to load listings: {e}");
                    state.last_error = Some(e.user_message());
                }
            }
        });
    });
}

#[component]
fn AppLayout() -> Element {
    let user = use_user_state();
    let mut shared = use_shared_state();
    let nav = use_navigator();

    let greeting = match user.read().viewer() {
        Some(id) => format!("Signed in as {}", id.short()),
        None => "Sign in to chat with sellers".to_string(),
    };
    let viewer = user.read().viewer().cloned();
    let open_chat = shared.read().open_chat.clone();

    rsx! {
        div { class: "bazaar-app",
            header { class: "app-header",
                h1 {
                    onclick: move |_| { nav.push(Route::Listings {}); },
                    "Bazaar"
                }
                span { class: "user-info", "{greeting}" }
            }
            main {
                Outlet::<Route> {}
            }
            if let (Some(target), Some(viewer)) = (open_chat, viewer) {
                ChatWidget {
                    key: "{target.key.product_id}-{target.key.seller_id}",
                    target,
                    viewer,
                    on_close: move |_| shared.write().open_chat = None,
                }
            }
        }
    }
}

/// Route component: the filterable listing grid.
#[component]
fn Listings() -> Element {
    rsx! { ListingView {} }
}

/// Route component: one product by id from the URL.
#[component]
fn Product(id: String) -> Element {
    rsx! { ProductView { id: ProductId::new(id) } }
}
