//! Codecs for the four service operations the client relies on.
//!
//! Each submodule turns one response body into core types; URL construction
//! for the same operations lives in [`request`].

mod capabilities;
mod describe;
mod error;
mod features;
mod hits;
pub mod request;

pub use capabilities::parse_capabilities;
pub use describe::parse_describe;
pub use error::ParseError;
pub use features::parse_feature_page;
pub use hits::parse_hits;
