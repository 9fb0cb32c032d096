pub mod config;
pub mod contact;
pub mod screen;
pub mod transcript;
pub mod types;

// Keep the public surface small and intentional.
pub use config::*;
pub use contact::*;
pub use screen::*;
pub use transcript::*;
pub use types::*;
