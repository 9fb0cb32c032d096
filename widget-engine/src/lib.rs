pub mod auth;
pub mod bootstrap;
pub mod call;
pub mod context;
pub mod persistence;
pub mod router;
pub mod screens;
pub mod traits;
