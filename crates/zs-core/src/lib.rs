//! zski/crates/zs-core/src/lib.rs
//!
//! Domain types and the capability traits every ZSki plugin implements.

pub mod blob;
pub mod error;
pub mod filter;
pub mod models;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use filter::*;
pub use models::*;
pub use traits::*;
