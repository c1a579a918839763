pub mod ai;
pub mod auth;
pub mod collections;
pub mod concierge;
pub mod health;
pub mod media;
pub mod metrics;
pub mod museums;
pub mod settings;
pub mod stops;
pub mod tours;
pub mod visitor;
