pub mod applications;
pub mod auth;
pub mod dashboard;
pub mod products;
pub mod resubmission;
