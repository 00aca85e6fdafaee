pub mod api_router;
pub mod auth;
pub mod company;
pub mod config;
pub mod directory;
pub mod mailer;
pub mod membership;
pub mod okr;
pub mod shared;
