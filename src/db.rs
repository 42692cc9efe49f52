pub mod user_repo;
pub use user_repo::UserRepository;
pub mod product_repo;
pub use product_repo::ProductRepository;
pub mod application_repo;
pub use application_repo::ApplicationRepository;
pub mod traveler_repo;
pub use traveler_repo::TravelerRepository;
pub mod dashboard_repo;
pub use dashboard_repo::DashboardRepository;
