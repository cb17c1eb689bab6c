//! `TopGun` Server — `WebSocket` server with clustering, partitioning, and `PostgreSQL` storage.

pub mod cluster;
pub mod coordinator;
pub mod gc;
pub mod hooks;
pub mod network;
pub mod search;
pub mod service;
#[cfg(feature = "simulation")]
pub mod sim;
pub mod storage;
pub mod traits;
pub mod view;

pub use coordinator::ServerCoordinator;
pub use service::{
    CallerOrigin, ManagedService, Operation, OperationContext, OperationError, OperationResponse,
    OperationService, OperationRouter, ServerConfig, ServiceContext, ServiceRegistry,
};
pub use traits::{MapProvider, SchemaProvider, ServerStorage};
