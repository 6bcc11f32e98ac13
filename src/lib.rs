pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod favorites;
pub mod models;
pub mod normalize;
pub mod paginate;
pub mod policy;
pub mod poster;
pub mod proxy;
pub mod sources;
pub mod store;
