pub mod api;
pub mod config;
pub mod db;
pub mod form;
pub mod handler;
pub mod policy;

pub use self::config::Config;
