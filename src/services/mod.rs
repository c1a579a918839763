pub mod ai;
pub mod auth;
pub mod collections;
pub mod concierge;
pub mod gemini;
pub mod media;
pub mod metrics;
pub mod museums;
pub mod settings;
pub mod slug;
pub mod stops;
pub mod tours;
pub mod translate;
pub mod tts;
pub mod visitor;
pub mod vision;
