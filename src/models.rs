pub mod application;
pub mod auth;
pub mod catalog;
pub mod dashboard;
