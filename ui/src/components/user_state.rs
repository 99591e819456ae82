use dioxus::prelude::*;

use bazaar_common::ids::UserId;

use crate::config::Identity;

/// The signed-in user, read once when the app starts.
#[derive(Clone, Debug, Default)]
pub struct UserState {
    pub identity: Option<Identity>,
}

impl UserState {
    pub fn load() -> Self {
        let identity = Identity::from_storage();
        match &identity {
            Some(id) => tracing::info!(user = %id.user_id, "signed in"),
            None => tracing::info!("browsing signed out"),
        }
        Self { identity }
    }

    pub fn viewer(&self) -> Option<&UserId> {
        self.identity.as_ref().map(|i| &i.user_id)
    }

    pub fn token(&self) -> Option<String> {
        self.identity.as_ref().and_then(|i| i.token.clone())
    }
}

pub fn use_user_state() -> Signal<UserState> {
    use_context::<Signal<UserState>>()
}
