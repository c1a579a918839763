pub mod auth;
pub mod collection;
pub mod concierge;
pub mod content;
pub mod i18n;
pub mod media;
pub mod museum;
pub mod stop;
pub mod tour;
