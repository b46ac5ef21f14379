pub mod admin;
pub mod banner_admin;
pub mod category_admin;
pub mod category_directory;
pub mod category_tree;
pub mod config;
pub mod directory;
pub mod events;
pub mod form_validation;
pub mod listing;
pub mod loader;
pub mod news;
pub mod post_admin;
pub mod practice_admin;
pub mod revalidation;
pub mod saga;
pub mod schema_check;
pub mod service_admin;
pub mod site_cache;
pub mod storage;
pub mod user_admin;
