//! Press - request-scoped JavaScript/CSS aggregation
//!
//! Collects the scripts and stylesheets a page registers while it renders,
//! combines them into one artifact per unique ordered source list, and
//! serves that artifact back by key on a later request.

pub mod asset;
pub mod cli;
pub mod compressor;
pub mod config;
pub mod error;
pub mod key;
pub mod minify;
pub mod press;
pub mod render;
pub mod serve;
pub mod session;
pub mod source;
pub mod store;
pub mod strategy;
pub mod tags;

pub use asset::{AssetKind, SourceRef};
pub use error::{PressError, PressResult};
pub use press::{AddOptions, ClosedTag, Press};
pub use strategy::CachingStrategy;
