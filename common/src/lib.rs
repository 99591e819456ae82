pub mod address;
pub mod chat;
pub mod ids;
pub mod message;
pub mod product;
