pub mod audit;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod domain;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod rate_limit;
pub mod response;
pub mod routes;
pub mod services;
pub mod settings;
pub mod state;
pub mod storage;
