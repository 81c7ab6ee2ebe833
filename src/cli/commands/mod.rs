//! CLI command implementations

pub mod bundle;
pub mod clear;
pub mod config;
pub mod key;
pub mod serve;

pub use bundle::execute as bundle;
pub use clear::execute as clear;
pub use config::execute as config;
pub use key::execute as key;
pub use serve::execute as serve;
