pub mod api;
pub mod classify;
pub mod config;
pub mod error;
pub mod fixture;
pub mod group;
pub mod http_client;
pub mod i18n;
pub mod lineup;
pub mod news;
pub mod page;
pub mod provider;
pub mod render;
pub mod state;
pub mod store;
pub mod ticker;
