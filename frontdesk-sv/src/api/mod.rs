//! HTTP API handlers for frontdesk-sv

pub mod health;
pub mod knowledge;
pub mod requests;

pub use health::health_routes;
pub use knowledge::knowledge_routes;
pub use requests::request_routes;
