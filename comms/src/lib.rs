/// Set of commands which the relay can receive and process
pub mod command;
/// Set of events the relay sends, either as replies or as room broadcasts
pub mod event;
/// Implementation of event and command transportation over TCP Streams.
/// Requires 'server' or 'client' features to be enabled and will bring in tokio dependency alongside with other dependencies
pub mod transport;
/// Client viewport dimensions shared by commands and events
pub mod viewport;
