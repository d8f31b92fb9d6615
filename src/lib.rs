pub mod accounts;
pub mod app;
pub mod auth;
pub mod availability;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod extract;
pub mod invitations;
pub mod languages;
pub mod mailer;
pub mod recordings;
pub mod state;
pub mod storage;
pub mod tasks;
pub mod uploads;
