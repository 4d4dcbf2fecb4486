pub mod models;
pub mod schema;

pub mod database;
pub mod store;

pub mod config;
pub mod error;
pub mod field_update;
pub mod ledger;
pub mod logging;
pub mod schedule;
pub mod settlement;
pub mod web_api_server;
