pub mod auth;
pub mod catalog;
pub mod listings;
pub mod purchases;
pub mod textgen;
