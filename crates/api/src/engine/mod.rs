//! Clients for the external workflow engine.

pub mod http_gateway;

pub use http_gateway::HttpDeploymentGateway;
