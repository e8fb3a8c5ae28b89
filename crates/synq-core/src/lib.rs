pub mod config;
pub mod logging;

pub mod command;
pub mod connector;
pub mod context;
pub mod queue;
pub mod result;
pub mod retry;
pub mod service;
pub mod store;
