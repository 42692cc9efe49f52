pub mod application_service;
pub mod auth;
pub mod catalog_service;
pub mod dashboard_service;
pub mod document_service;
pub mod notification_service;
pub mod resubmission_service;
pub mod response_service;
pub mod upload_service;
pub mod visibility_service;
