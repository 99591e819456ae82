use dioxus::prelude::*;

use bazaar_common::address::AddressSelection;
use bazaar_common::ids::ProductId;
use bazaar_common::product::{categories, ListingQuery, Product};

use super::address_filter_view::AddressFilterView;
use super::app::Route;
use super::shared_state::{use_shared_state, ChatTarget};
use super::user_state::use_user_state;

/// Price in taka from the smallest currency unit.
fn format_price(price: u64) -> String {
    let taka = price / 100;
    let paisa = price % 100;
    if paisa == 0 {
        format!("৳{taka}")
    } else {
        format!("৳{taka}.{paisa:02}")
    }
}

/// Parse a price box in whole taka. Anything that is not a representable
/// amount means no bound.
fn parse_bound(input: &str) -> Option<u64> {
    input
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|taka| taka.checked_mul(100))
}

#[component]
pub fn ListingView() -> Element {
    let shared = use_shared_state();
    let mut search_text = use_signal(String::new);
    let mut category = use_signal(|| None::<String>);
    let mut min_price = use_signal(String::new);
    let mut max_price = use_signal(String::new);
    let mut address = use_signal(AddressSelection::default);

    let query = ListingQuery {
        text: search_text.read().clone(),
        address: address.read().clone(),
        category: category.read().clone(),
        min_price: parse_bound(&min_price.read()),
        max_price: parse_bound(&max_price.read()),
    };

    let state = shared.read();
    let all_categories = categories(&state.products);
    let matching: Vec<Product> = query.filter(&state.products).into_iter().cloned().collect();
    let loading = state.loading;
    let error = state.last_error.clone();
    drop(state);

    rsx! {
        div { class: "listing-view",
            div { class: "listing-filters",
                input {
                    r#type: "text",
                    placeholder: "Search products...",
                    value: "{search_text}",
                    oninput: move |evt| search_text.set(evt.value()),
                }
                select {
                    onchange: move |evt| {
                        let value = evt.value();
                        category.set(if value.is_empty() { None } else { Some(value) });
                    },
                    option { value: "", "All categories" }
                    for cat in all_categories {
                        option { key: "{cat}", value: "{cat}", "{cat}" }
                    }
                }
                input {
                    r#type: "number",
                    placeholder: "Min ৳",
                    value: "{min_price}",
                    oninput: move |evt| min_price.set(evt.value()),
                }
                input {
                    r#type: "number",
                    placeholder: "Max ৳",
                    value: "{max_price}",
                    oninput: move |evt| max_price.set(evt.value()),
                }
                AddressFilterView {
                    on_change: move |selection| address.set(selection),
                }
            }

            if let Some(err) = error {
                p { class: "error", "{err}" }
            }

            if loading {
                p { class: "loading", "Loading listings..." }
            } else if matching.is_empty() {
                p { class: "empty", "No products match your filters." }
            } else {
                div { class: "product-grid",
                    for product in matching {
                        ProductCard { key: "{product.id}", product }
                    }
                }
            }
        }
    }
}

#[component]
fn ProductCard(product: Product) -> Element {
    let nav = use_navigator();
    let price = format_price(product.price);
    let place = product.address.display_name();
    let thumbnail = product.images.first().cloned();
    let id = product.id.to_string();

    rsx! {
        div {
            class: "product-card",
            onclick: move |_| { nav.push(Route::Product { id: id.clone() }); },
            if let Some(src) = thumbnail {
                img { class: "product-thumb", src: "{src}", alt: "{product.title}" }
            }
            h3 { "{product.title}" }
            p { class: "product-price", "{price}" }
            p { class: "product-place", "{place}" }
        }
    }
}

#[component]
pub fn ProductView(id: ProductId) -> Element {
    let mut shared = use_shared_state();
    let user = use_user_state();
    let nav = use_navigator();

    let product = shared.read().products.iter().find(|p| p.id == id).cloned();
    let Some(product) = product else {
        return rsx! {
            div { class: "product-view",
                p { "This listing is no longer available." }
                button { onclick: move |_| { nav.push(Route::Listings {}); }, "Back to listings" }
            }
        };
    };

    let chat_target = user
        .read()
        .viewer()
        .and_then(|viewer| ChatTarget::for_product(&product, viewer));
    let signed_in = user.read().viewer().is_some();
    let price = format_price(product.price);
    let place = product.address.display_name();

    rsx! {
        div { class: "product-view",
            button { onclick: move |_| { nav.push(Route::Listings {}); }, "Back to listings" }
            h2 { "{product.title}" }
            div { class: "product-images",
                for (i, src) in product.images.iter().enumerate() {
                    img { key: "{i}", src: "{src}", alt: "{product.title}" }
                }
            }
            p { class: "product-price", "{price}" }
            p { class: "product-category", "{product.category}" }
            p { class: "product-place", "{place}" }
            p { class: "product-description", "{product.description}" }

            if let Some(target) = chat_target {
                button {
                    class: "chat-open-btn",
                    onclick: move |_| shared.write().open_chat = Some(target.clone()),
                    "Chat with seller"
                }
            } else if !signed_in {
                p { class: "chat-hint", "Sign in to chat with the seller." }
            }
        }
    }
}
