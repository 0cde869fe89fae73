pub mod config;
pub mod transcript;

pub use self::config::*;
pub use self::transcript::*;
