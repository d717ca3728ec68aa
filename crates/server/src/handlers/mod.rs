//! Request handlers.

pub mod health;
pub mod tenants;
pub mod whoami;
