pub mod config;
pub mod db;
pub mod error;
pub mod google_auth;
pub mod types;
