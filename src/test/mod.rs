mod api;
mod config;
mod migrations;
mod permissions;
mod router;
mod schema;
mod seed;
mod swagger;
pub mod utils;
