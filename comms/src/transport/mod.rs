/// Transport over TCP implementation for a client to be able to interact with the relay
#[cfg(feature = "client")]
pub mod client;
/// Newline delimited JSON framing shared by both sides
#[cfg(any(feature = "client", feature = "server"))]
mod common;
/// Transport over TCP implementation for the relay to interact with a single client TCP Stream
#[cfg(feature = "server")]
pub mod server;
