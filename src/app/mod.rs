pub mod auth;
pub mod notices;
pub mod notifier;
pub mod reaper;
