pub mod auth;
pub mod clock;
pub mod configuration;
pub mod cookies;
pub mod credentials;
pub mod error;
pub mod logger;
pub mod middleware;
pub mod routes;
pub mod startup;
pub mod telemetry;
pub mod validators;
