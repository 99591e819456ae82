use dioxus::prelude::*;

use bazaar_common::address::{AddressFilter, AddressLevel, AddressSelection, OptionsRequest};

use super::shared_state::use_shared_state;
use crate::api::{GeoBackend, GeoClient};

/// Run one option lookup and feed the result back into the filter.
fn load_options(mut filter: Signal<AddressFilter>, geo: GeoClient, request: OptionsRequest) {
    spawn(async move {
        let result = geo.options_for(&request).await;
        let mut filter = filter.write();
        match result {
            Ok(options) => {
                if !filter.apply_options(request.token, options) {
                    tracing::debug!(level = ?request.level, token = request.token, "dropping stale address options");
                }
            }
            Err(e) => {
                tracing::warn!(level = ?request.level, parent = ?request.parent, "failed to load address options: {e}");
                filter.fail_options(request.token);
            }
        }
    });
}

/// An empty `value` clears the level.
fn choose(
    mut filter: Signal<AddressFilter>,
    geo: GeoClient,
    on_change: EventHandler<AddressSelection>,
    level: AddressLevel,
    value: String,
) {
    let request = filter.write().select(level, Some(value));
    on_change.call(filter.peek().selection().clone());
    if let Some(request) = request {
        load_options(filter, geo, request);
    }
}

/// Four dependent dropdowns. Reports the selection after every change.
#[component]
pub fn AddressFilterView(on_change: EventHandler<AddressSelection>) -> Element {
    let shared = use_shared_state();
    let mut filter = use_signal(AddressFilter::new);

    use_hook(move || {
        let request = filter.write().bootstrap();
        load_options(filter, shared.peek().geo.clone(), request);
    });

    let state = filter.read();
    let levels: Vec<(AddressLevel, Vec<String>, Option<String>, bool, bool)> = AddressLevel::ALL
        .iter()
        .map(|&level| {
            (
                level,
                state.options(level).to_vec(),
                state.selection().get(level).map(str::to_string),
                state.is_enabled(level),
                state.is_loading(level),
            )
        })
        .collect();
    let any_selected = !state.selection().is_empty();
    drop(state);

    rsx! {
        div { class: "address-filter",
            for (level, options, selected, enabled, loading) in levels {
                select {
                    key: "{level.label()}",
                    disabled: !enabled,
                    onchange: move |evt| {
                        let geo = shared.peek().geo.clone();
                        choose(filter, geo, on_change, level, evt.value());
                    },
                    option {
                        value: "",
                        selected: selected.is_none(),
                        if loading { "Loading..." } else { "Any {level.label().to_lowercase()}" }
                    }
                    for opt in options {
                        option {
                            key: "{opt}",
                            value: "{opt}",
                            selected: selected.as_deref() == Some(opt.as_str()),
                            "{opt}"
                        }
                    }
                }
            }
            if any_selected {
                button {
                    class: "address-reset",
                    onclick: move |_| {
                        let request = filter.write().reset();
                        on_change.call(AddressSelection::default());
                        load_options(filter, shared.peek().geo.clone(), request);
                    },
                    "Clear location"
                }
            }
        }
    }
}
