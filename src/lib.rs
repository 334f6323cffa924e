#![doc = "The `task_manager` library crate."]
#![doc = ""]
#![doc = "Users, tasks, statuses and labels behind session authentication: domain models,"]
#![doc = "storage, form validation, flash notices, the task filter, routing and error handling."]
#![doc = "The binary (`main.rs`) wires these into an `HttpServer`; the integration tests build"]
#![doc = "the same `App` against an in-memory database."]

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod flash;
pub mod forms;
pub mod models;
pub mod routes;
