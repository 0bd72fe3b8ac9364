//! Ray Tracer API - HTTP front for the calcus ray tracing engine
//!
//! Accepts a geometry/radiation request over HTTP, stages it as a JSON file,
//! runs the external executable against it under a deadline, and decodes the
//! line-oriented stdout into a structured response.
//!
//! ## Pipeline
//!
//! validate -> stage -> execute -> decode
//!
//! Each stage short-circuits: client input errors never reach the executable,
//! and the staged file is removed on every path.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ray_tracer_api::config::ServerConfig;
//! use ray_tracer_api::routes::{app, AppState};
//!
//! let config = ServerConfig::from_env()?;
//! let router = app(AppState::from_config(config));
//! ```

pub mod config;
pub mod decode;
pub mod dispatch;
pub mod error;
pub mod executors;
pub mod routes;
pub mod staging;
pub mod types;
pub mod validate;
