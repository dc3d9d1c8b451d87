//! Kraken REST endpoints
//!
//! Each endpoint is a marker type implementing [`Endpoint`](crate::Endpoint),
//! together with the typed parameter setters for its
//! [`RequestBuilder`](crate::RequestBuilder) and the types its result decodes
//! into.
//!
//! Weights follow Kraken's call-counter costs. The order endpoints
//! (`AddOrder`, `CancelOrder`) are weight 0: Kraken meters them against a
//! separate per-pair order limit this client does not track.

/// Declare an endpoint marker type
macro_rules! endpoint {
    (
        $(#[$meta:meta])*
        $name:ident: $method:ident $path:literal, weight $weight:literal, $visibility:ident => $output:ty
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name;

        impl $crate::endpoint::Endpoint for $name {
            type Output = $output;
            const NAME: &'static str = stringify!($name);
            const METHOD: $crate::transport::HttpMethod = $crate::transport::HttpMethod::$method;
            const PATH: &'static str = $path;
            const WEIGHT: u32 = $weight;
            const VISIBILITY: $crate::endpoint::Visibility = $crate::endpoint::Visibility::$visibility;
        }
    };
}

pub mod account;
pub mod funding;
pub mod market;
pub mod trading;

pub use account::*;
pub use funding::*;
pub use market::*;
pub use trading::*;
