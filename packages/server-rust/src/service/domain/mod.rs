//! Domain services.
//!
//! Each service implements both `ManagedService` (lifecycle) and `tower::Service<Operation>`
//! (request handling). `CrdtService` delegates to a `ServerCoordinator`; `PersistenceService`
//! runs entry processors and conflict resolvers through sandboxed scripts; the rest are stubs
//! that return `OperationResponse::NotImplemented` until their own domain logic lands.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use tower::Service;

use topgun_core::messages::{
    EntryProcessBatchResponseData, EntryProcessKeyResult, EntryProcessResponseData, ListResolversResponseData,
    Message, RegisterResolverResponseData, ResolverInfo, UnregisterResolverResponseData,
};
use topgun_core::MapType;

use crate::coordinator::ServerCoordinator;
use crate::hooks::entry_processor::{run_entry_processor, EntryProcessorCache, EntryProcessorOutcome};
use crate::hooks::resolver::ResolverRegistry;
use crate::service::operation::{
    service_names, Operation, OperationError, OperationResponse,
};
use crate::service::registry::{ManagedService, ServiceContext};
use crate::traits::MapProvider;

// ---------------------------------------------------------------------------
// Macro for repetitive stub implementations
// ---------------------------------------------------------------------------

/// Generate a domain service stub with the given name and service constant.
macro_rules! domain_stub {
    (
        $(#[$meta:meta])*
        $name:ident, $svc_name:expr
    ) => {
        $(#[$meta])*
        pub struct $name;

        #[async_trait]
        impl ManagedService for $name {
            fn name(&self) -> &'static str {
                $svc_name
            }

            async fn init(&self, _ctx: &ServiceContext) -> anyhow::Result<()> {
                Ok(())
            }

            async fn reset(&self) -> anyhow::Result<()> {
                Ok(())
            }

            async fn shutdown(&self, _terminate: bool) -> anyhow::Result<()> {
                Ok(())
            }
        }

        impl Service<Operation> for Arc<$name> {
            type Response = OperationResponse;
            type Error = OperationError;
            type Future =
                Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

            fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
                Poll::Ready(Ok(()))
            }

            fn call(&mut self, op: Operation) -> Self::Future {
                let call_id = op.ctx().call_id;
                let name = $svc_name;
                Box::pin(async move {
                    Ok(OperationResponse::NotImplemented {
                        service_name: name,
                        call_id,
                    })
                })
            }
        }
    };
}

// ---------------------------------------------------------------------------
// CRDT domain service
// ---------------------------------------------------------------------------

/// CRDT domain service: routes `ClientOp`/`OpBatch` operations to a
/// [`ServerCoordinator`] instead of the generic stub response.
pub struct CrdtService {
    coordinator: Arc<ServerCoordinator>,
}

impl CrdtService {
    #[must_use]
    pub fn new(coordinator: Arc<ServerCoordinator>) -> Self {
        Self { coordinator }
    }
}

#[async_trait]
impl ManagedService for CrdtService {
    fn name(&self) -> &'static str {
        service_names::CRDT
    }

    async fn init(&self, _ctx: &ServiceContext) -> anyhow::Result<()> {
        Ok(())
    }

    async fn reset(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn shutdown(&self, _terminate: bool) -> anyhow::Result<()> {
        Ok(())
    }
}

impl Service<Operation> for Arc<CrdtService> {
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let this = Arc::clone(self);
        Box::pin(async move {
            match op {
                Operation::ClientOp { ctx, payload } => {
                    this.coordinator.process_local_op(&ctx, payload.payload).await
                }
                Operation::OpBatch { ctx, payload } => {
                    this.coordinator.process_batch(&ctx, payload.payload.ops).await
                }
                other => {
                    let ctx = other.ctx();
                    Ok(OperationResponse::NotImplemented {
                        service_name: service_names::CRDT,
                        call_id: ctx.call_id,
                    })
                }
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Domain service stubs
// ---------------------------------------------------------------------------

domain_stub!(
    /// Sync domain service (Merkle tree synchronization).
    SyncService, service_names::SYNC
);

domain_stub!(
    /// Query domain service (live query subscriptions).
    QueryService, service_names::QUERY
);

domain_stub!(
    /// Messaging domain service (topic pub/sub).
    MessagingService, service_names::MESSAGING
);

domain_stub!(
    /// Coordination domain service (locks, partition map, heartbeat).
    CoordinationService, service_names::COORDINATION
);

domain_stub!(
    /// Search domain service (full-text search).
    SearchService, service_names::SEARCH
);

// ---------------------------------------------------------------------------
// Persistence domain service
// ---------------------------------------------------------------------------

/// Persistence domain service: entry processing and conflict resolver
/// registration run through sandboxed `rhai` scripts; counters, journal, and
/// PN-Counter sync still fall back to `NotImplemented`.
pub struct PersistenceService {
    maps: Arc<dyn MapProvider>,
    processors: EntryProcessorCache,
    resolvers: ResolverRegistry,
}

impl PersistenceService {
    #[must_use]
    pub fn new(maps: Arc<dyn MapProvider>) -> Self {
        Self {
            maps,
            processors: EntryProcessorCache::new(),
            resolvers: ResolverRegistry::new(),
        }
    }

    async fn run_one(
        &self,
        map_name: &str,
        key: &str,
        processor: &topgun_core::messages::EntryProcessor,
    ) -> Result<EntryProcessorOutcome, String> {
        let map = self
            .maps
            .get_or_load_map(map_name, MapType::Lww)
            .await
            .map_err(|e| e.to_string())?;
        let current = match map.snapshot_key(key) {
            topgun_core::KeySnapshot::Single(value) => value,
            _ => return Err(format!("map '{map_name}' is not LWW-backed")),
        };
        let outcome = run_entry_processor(&self.processors, key, current.as_ref(), processor)
            .map_err(|e| e.to_string())?;
        if let Some(new_value) = outcome.new_value.clone() {
            map.apply_local_set(key, new_value, None);
        }
        Ok(outcome)
    }

    async fn entry_process(
        &self,
        payload: topgun_core::messages::EntryProcessData,
    ) -> EntryProcessResponseData {
        match self.run_one(&payload.map_name, &payload.key, &payload.processor).await {
            Ok(outcome) => EntryProcessResponseData {
                request_id: payload.request_id,
                success: true,
                result: outcome.result.map(|v| v.to_rmpv()),
                new_value: outcome.new_value.map(|v| v.to_rmpv()),
                error: None,
            },
            Err(message) => EntryProcessResponseData {
                request_id: payload.request_id,
                success: false,
                result: None,
                new_value: None,
                error: Some(message),
            },
        }
    }

    async fn entry_process_batch(
        &self,
        payload: topgun_core::messages::EntryProcessBatchData,
    ) -> EntryProcessBatchResponseData {
        let mut results = std::collections::HashMap::new();
        for key in &payload.keys {
            let result = match self.run_one(&payload.map_name, key, &payload.processor).await {
                Ok(outcome) => EntryProcessKeyResult {
                    success: true,
                    result: outcome.result.map(|v| v.to_rmpv()),
                    new_value: outcome.new_value.map(|v| v.to_rmpv()),
                    error: None,
                },
                Err(message) => EntryProcessKeyResult {
                    success: false,
                    result: None,
                    new_value: None,
                    error: Some(message),
                },
            };
            results.insert(key.clone(), result);
        }
        EntryProcessBatchResponseData {
            request_id: payload.request_id,
            results,
        }
    }

    fn register_resolver(
        &self,
        payload: topgun_core::messages::RegisterResolverData,
    ) -> RegisterResolverResponseData {
        match self.resolvers.register(&payload.map_name, payload.resolver) {
            Ok(()) => RegisterResolverResponseData {
                request_id: payload.request_id,
                success: true,
                error: None,
            },
            Err(err) => RegisterResolverResponseData {
                request_id: payload.request_id,
                success: false,
                error: Some(err.to_string()),
            },
        }
    }

    fn unregister_resolver(
        &self,
        payload: topgun_core::messages::UnregisterResolverData,
    ) -> UnregisterResolverResponseData {
        let success = self
            .resolvers
            .unregister(&payload.map_name, &payload.resolver_name);
        UnregisterResolverResponseData {
            request_id: payload.request_id,
            success,
            error: if success {
                None
            } else {
                Some(format!(
                    "resolver '{}' not found on map '{}'",
                    payload.resolver_name, payload.map_name
                ))
            },
        }
    }

    fn list_resolvers(
        &self,
        payload: topgun_core::messages::ListResolversData,
    ) -> ListResolversResponseData {
        let resolvers = self
            .resolvers
            .list(payload.map_name.as_deref())
            .into_iter()
            .map(|(map_name, resolver)| ResolverInfo {
                map_name,
                name: resolver.name,
                priority: resolver.priority,
                key_pattern: resolver.key_pattern,
            })
            .collect();
        ListResolversResponseData {
            request_id: payload.request_id,
            resolvers,
        }
    }
}

#[async_trait]
impl ManagedService for PersistenceService {
    fn name(&self) -> &'static str {
        service_names::PERSISTENCE
    }

    async fn init(&self, _ctx: &ServiceContext) -> anyhow::Result<()> {
        Ok(())
    }

    async fn reset(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn shutdown(&self, _terminate: bool) -> anyhow::Result<()> {
        Ok(())
    }
}

impl Service<Operation> for Arc<PersistenceService> {
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let this = Arc::clone(self);
        Box::pin(async move {
            match op {
                Operation::EntryProcess { payload, .. } => {
                    let data = this.entry_process(payload).await;
                    Ok(OperationResponse::Message(Box::new(Message::EntryProcessResponse(data))))
                }
                Operation::EntryProcessBatch { payload, .. } => {
                    let data = this.entry_process_batch(payload).await;
                    Ok(OperationResponse::Message(Box::new(
                        Message::EntryProcessBatchResponse(data),
                    )))
                }
                Operation::RegisterResolver { payload, .. } => {
                    let data = this.register_resolver(payload);
                    Ok(OperationResponse::Message(Box::new(
                        Message::RegisterResolverResponse(data),
                    )))
                }
                Operation::UnregisterResolver { payload, .. } => {
                    let data = this.unregister_resolver(payload);
                    Ok(OperationResponse::Message(Box::new(
                        Message::UnregisterResolverResponse(data),
                    )))
                }
                Operation::ListResolvers { payload, .. } => {
                    let data = this.list_resolvers(payload);
                    Ok(OperationResponse::Message(Box::new(Message::ListResolversResponse(data))))
                }
                other => {
                    let ctx = other.ctx();
                    Ok(OperationResponse::NotImplemented {
                        service_name: service_names::PERSISTENCE,
                        call_id: ctx.call_id,
                    })
                }
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
