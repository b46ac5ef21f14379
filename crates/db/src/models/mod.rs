pub mod access_request;
pub mod locale;
pub mod news_banner;
pub mod post;
pub mod post_category;
pub mod practice;
pub mod profile;
pub mod service;
pub mod table;
pub mod team;
pub mod translation;
