// Shared library for the live event poller: status tracking, per-event
// polling jobs and retrying publication to the message stream

pub mod bootstrap;
pub mod config;
pub mod errors;
pub mod models;
pub mod queue;
pub mod repository;
pub mod retry;
pub mod scheduler;
pub mod service;
pub mod source;
pub mod telemetry;
