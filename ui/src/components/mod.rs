pub mod address_filter_view;
pub mod app;
pub mod chat_widget;
pub mod listing_view;
pub mod shared_state;
pub mod user_state;

pub use app::App;
