pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod delta;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod observer;
pub mod odata;
pub mod outcome;
pub mod services;
pub mod storage;
pub mod tenancy;
pub mod types;
