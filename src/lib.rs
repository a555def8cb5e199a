// Infrastructure (shared components)
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

// Engine (pure, stateless)
pub mod fields;
pub mod template;

// Domain
pub mod batch;
pub mod proxy;
pub mod workspace;

// Application layer
pub mod api;
pub mod server;
