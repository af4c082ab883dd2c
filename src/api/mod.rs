/// API error types and handling
pub mod errors;
/// HTTP handlers for the chat endpoints
pub mod handlers;
/// Correlation id propagation
pub mod middleware;
/// Routes configuration and setup
pub mod routes;
/// HTTP server implementation
pub mod server;
