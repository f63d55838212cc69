pub mod analysis;
pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod db;
pub mod env;
pub mod error;
pub mod models;
pub mod report;
pub mod router;
pub mod seed;
pub mod swagger;
pub mod telemetry;
#[cfg(test)]
mod test;
