pub mod config;
pub mod dtos;
pub mod events;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod query;
pub mod security;
pub mod services;
pub mod startup;
pub mod workers;
