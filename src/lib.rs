pub mod api;
pub mod auth;
pub mod config;
pub mod display;
pub mod error;
pub mod executor;
pub mod generator;
pub mod logs;
pub mod policy;
pub mod report;
pub mod request;
pub mod runner;
pub mod table;
