//! garnet: static code intelligence for Ruby
//!
//! garnet indexes a workspace of Ruby sources plus pre-indexed
//! documentation archives and answers code-intelligence queries: namespace
//! lookup, method and constant enumeration, signature-chain type
//! inference, and path-based documentation retrieval.
//!
//! The entry point is [`ApiMap`]: construct one for a workspace, feed it
//! editor events (`virtualize` for buffer overlays, `update` for saves),
//! and query it. All queries are synchronous and refresh the index first,
//! so results always reflect the latest mutation.

pub mod api_map;
mod cache;
pub mod config;
pub mod live_map;
pub mod logging;
pub mod node;
pub mod parser;
pub mod pin;
pub mod source;
pub mod suggestion;
pub mod yard_map;

pub use api_map::ApiMap;
pub use config::Config;
pub use live_map::{LiveMap, LiveProvider};
pub use logging::init_logger;
pub use node::{Node, Position, Range};
pub use pin::{Pin, PinDetails, PinKind, Scope, Visibility};
pub use source::Source;
pub use suggestion::{Suggestion, SuggestionKind};
pub use yard_map::YardMap;
