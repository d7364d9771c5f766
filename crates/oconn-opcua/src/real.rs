// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Transport implementation over the `opcua` crate.
//!
//! One persistent session with the library's own retry machinery. The
//! session run loop executes on a dedicated thread; data-change
//! notifications are forwarded into an unbounded channel and consumed by
//! the runtime's dispatcher pump, so no workflow ever executes on the
//! delivery thread.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use opcua::client::prelude::*;
use opcua::sync::RwLock as OpcUaRwLock;

use oconn_core::address::NodeId as CoreNodeId;
use oconn_core::control::{BrowsedNode, Notification};
use oconn_core::error::{PlaneError, PlaneResult};
use oconn_core::types::PlaneValue;

use crate::certificate::{prepare_pki, SubjectLog};
use crate::transport::{OpcUaTransport, ReadOutcome, TransportState};
use crate::types::OpcUaConfig;

/// Browse mask: objects (bit 0) and variables (bit 1).
const BROWSE_NODE_CLASS_MASK: u32 = 0b11;

// =============================================================================
// RealOpcUaTransport
// =============================================================================

/// The production transport.
pub struct RealOpcUaTransport {
    config: OpcUaConfig,
    state: RwLock<TransportState>,
    session: RwLock<Option<Arc<OpcUaRwLock<Session>>>>,
    notifications: mpsc::UnboundedSender<Notification>,
    subjects: SubjectLog,
    next_client_handle: AtomicU32,
}

impl RealOpcUaTransport {
    /// Creates a transport; notifications flow into `notifications`.
    pub fn new(config: OpcUaConfig, notifications: mpsc::UnboundedSender<Notification>) -> Self {
        Self {
            config,
            state: RwLock::new(TransportState::Disconnected),
            session: RwLock::new(None),
            notifications,
            subjects: SubjectLog::new(),
            next_client_handle: AtomicU32::new(1),
        }
    }

    fn build_client(&self) -> PlaneResult<Client> {
        prepare_pki(&self.config.pki_dir)
            .map_err(|e| PlaneError::connection(format!("PKI directory: {}", e)))?;

        let builder = ClientBuilder::new()
            .application_name(self.config.application_name.as_str())
            .application_uri(self.config.application_uri.as_str())
            .pki_dir(self.config.pki_dir.clone())
            .create_sample_keypair(true)
            .trust_server_certs(true)
            .session_retry_limit(self.config.session_retry_limit)
            .session_timeout(self.config.session_timeout.as_millis() as u32);

        builder
            .client()
            .ok_or_else(|| PlaneError::connection("Failed to build OPC UA client"))
    }

    fn get_session(&self) -> PlaneResult<Arc<OpcUaRwLock<Session>>> {
        self.session
            .read()
            .clone()
            .ok_or(PlaneError::NotConnected)
    }

    /// Converts a core node id (always `ns=<n>;s=<id>` here) to the library
    /// form.
    fn to_ua_node_id(node: &CoreNodeId) -> opcua::types::NodeId {
        let s = node.as_str();
        if let Some(rest) = s.strip_prefix("ns=") {
            if let Some((ns, id)) = rest.split_once(";s=") {
                if let Ok(ns) = ns.parse::<u16>() {
                    return opcua::types::NodeId::new(ns, id.to_string());
                }
            }
        }
        opcua::types::NodeId::new(2, s.to_string())
    }

    fn from_ua_node_id(node: &opcua::types::NodeId) -> CoreNodeId {
        CoreNodeId::new(node.to_string())
    }

    /// Maps a library variant into the bridge's value union. `Empty` maps
    /// to `None`; exotic types are carried as their debug text.
    fn from_variant(variant: &Variant) -> Option<PlaneValue> {
        match variant {
            Variant::Empty => None,
            Variant::Boolean(v) => Some(PlaneValue::Bool(*v)),
            Variant::SByte(v) => Some(PlaneValue::Int32(*v as i32)),
            Variant::Byte(v) => Some(PlaneValue::Int32(*v as i32)),
            Variant::Int16(v) => Some(PlaneValue::Int32(*v as i32)),
            Variant::UInt16(v) => Some(PlaneValue::Int32(*v as i32)),
            Variant::Int32(v) => Some(PlaneValue::Int32(*v)),
            Variant::UInt32(v) => Some(PlaneValue::Int64(*v as i64)),
            Variant::Int64(v) => Some(PlaneValue::Int64(*v)),
            Variant::UInt64(v) => Some(PlaneValue::Int64(*v as i64)),
            Variant::Float(v) => Some(PlaneValue::Double(*v as f64)),
            Variant::Double(v) => Some(PlaneValue::Double(*v)),
            Variant::String(v) => Some(PlaneValue::String(v.as_ref().to_string())),
            Variant::DateTime(v) => Some(PlaneValue::DateTime(v.as_chrono())),
            other => Some(PlaneValue::String(format!("{:?}", other))),
        }
    }

    fn to_variant(value: &PlaneValue) -> Variant {
        match value {
            PlaneValue::Bool(v) => Variant::Boolean(*v),
            PlaneValue::Int32(v) => Variant::Int32(*v),
            PlaneValue::Int64(v) => Variant::Int64(*v),
            PlaneValue::Double(v) => Variant::Double(*v),
            PlaneValue::String(v) => Variant::String(opcua::types::UAString::from(v.as_str())),
            PlaneValue::DateTime(v) => {
                Variant::DateTime(Box::new(opcua::types::DateTime::from(*v)))
            }
        }
    }

    fn identity_token(&self, endpoint: &EndpointDescription) -> IdentityToken {
        if self.config.uses_user_auth() && endpoint_supports_username(endpoint) {
            IdentityToken::UserName(self.config.username.clone(), self.config.password.clone())
        } else {
            if self.config.uses_user_auth() {
                warn!("Endpoint does not offer UserName tokens, falling back to anonymous");
            }
            IdentityToken::Anonymous
        }
    }
}

/// Returns `true` when the endpoint offers user-name token policies.
fn endpoint_supports_username(endpoint: &EndpointDescription) -> bool {
    endpoint
        .user_identity_tokens
        .as_ref()
        .map(|tokens| {
            tokens
                .iter()
                .any(|t| t.token_type == UserTokenType::UserName)
        })
        .unwrap_or(false)
}

#[async_trait::async_trait]
impl OpcUaTransport for RealOpcUaTransport {
    async fn connect(&self) -> PlaneResult<()> {
        *self.state.write() = TransportState::Connecting;

        info!(endpoint = %self.config.endpoint, "Connecting to control plane");

        let client = self.build_client()?;

        let endpoints = client
            .get_server_endpoints_from_url(&self.config.endpoint)
            .map_err(|e| {
                *self.state.write() = TransportState::Failed;
                PlaneError::connection(format!("endpoint discovery: {}", e))
            })?;

        // Validation is permissive: every certificate is accepted and its
        // subject logged once.
        for endpoint in &endpoints {
            self.subjects.note(endpoint.server_certificate.value.as_deref());
        }

        // Prefer the unsecured endpoint; the fleet servers run without
        // message security.
        let endpoint = endpoints
            .iter()
            .find(|e| e.security_mode == MessageSecurityMode::None)
            .or_else(|| endpoints.first())
            .cloned()
            .ok_or_else(|| {
                *self.state.write() = TransportState::Failed;
                PlaneError::connection("server returned no endpoints")
            })?;

        let identity_token = self.identity_token(&endpoint);

        let mut client = client;
        let session = client
            .connect_to_endpoint(endpoint, identity_token)
            .map_err(|e| {
                *self.state.write() = TransportState::Failed;
                PlaneError::connection(format!("connect: {}", e))
            })?;

        // The session run loop pumps publish responses on its own thread
        // until disconnect.
        {
            let run_session = session.clone();
            std::thread::Builder::new()
                .name("opcua-session".to_string())
                .spawn(move || {
                    let _ = Session::run(run_session);
                })
                .map_err(|e| PlaneError::connection(format!("session thread: {}", e)))?;
        }

        *self.session.write() = Some(session);
        *self.state.write() = TransportState::Connected;

        info!(endpoint = %self.config.endpoint, "Control plane connected");
        Ok(())
    }

    async fn disconnect(&self) -> PlaneResult<()> {
        let session = self.session.write().take();
        if let Some(session) = session {
            let session = session.read();
            session.disconnect();
        }
        *self.state.write() = TransportState::Disconnected;
        info!("Control plane disconnected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        if !self.state.read().is_connected() {
            return false;
        }
        match self.session.read().as_ref() {
            Some(session) => session.read().is_connected(),
            None => false,
        }
    }

    fn state(&self) -> TransportState {
        *self.state.read()
    }

    async fn read_value(&self, node: &CoreNodeId) -> PlaneResult<ReadOutcome> {
        let session = self.get_session()?;
        let read_value_id = ReadValueId {
            node_id: Self::to_ua_node_id(node),
            attribute_id: AttributeId::Value as u32,
            index_range: opcua::types::UAString::null(),
            data_encoding: opcua::types::QualifiedName::null(),
        };

        trace!(node = %node, "Read");

        let results = {
            let session = session.read();
            session
                .read(&[read_value_id], TimestampsToReturn::Both, 0.0)
                .map_err(|e| PlaneError::operation(node.as_str(), format!("read: {}", e)))?
        };

        let Some(data_value) = results.first() else {
            return Ok(ReadOutcome::bad());
        };

        let good = data_value
            .status
            .as_ref()
            .map(|s| s.is_good())
            .unwrap_or(true);
        if !good {
            return Ok(ReadOutcome::bad());
        }

        let value = data_value
            .value
            .as_ref()
            .and_then(Self::from_variant);
        Ok(ReadOutcome {
            good: value.is_some(),
            value,
            source_timestamp: data_value.source_timestamp.map(|t| t.as_chrono()),
        })
    }

    async fn write_value(&self, node: &CoreNodeId, value: PlaneValue) -> PlaneResult<bool> {
        let session = self.get_session()?;
        let write_value = WriteValue {
            node_id: Self::to_ua_node_id(node),
            attribute_id: AttributeId::Value as u32,
            index_range: opcua::types::UAString::null(),
            value: opcua::types::DataValue::new_now(Self::to_variant(&value)),
        };

        trace!(node = %node, "Write");

        let results = {
            let session = session.read();
            session
                .write(&[write_value])
                .map_err(|e| PlaneError::operation(node.as_str(), format!("write: {}", e)))?
        };

        Ok(results.first().map(|s| s.is_good()).unwrap_or(false))
    }

    async fn browse(&self, node: &CoreNodeId) -> PlaneResult<Vec<BrowsedNode>> {
        let session = self.get_session()?;
        let description = BrowseDescription {
            node_id: Self::to_ua_node_id(node),
            browse_direction: BrowseDirection::Forward,
            reference_type_id: ReferenceTypeId::HierarchicalReferences.into(),
            include_subtypes: true,
            node_class_mask: BROWSE_NODE_CLASS_MASK,
            result_mask: BrowseDescriptionResultMask::all().bits(),
        };

        let results = {
            let session = session.read();
            session
                .browse(&[description])
                .map_err(|e| PlaneError::browse(node.as_str(), format!("{}", e)))?
        };

        let Some(results) = results else {
            return Ok(Vec::new());
        };
        let Some(result) = results.first() else {
            return Ok(Vec::new());
        };

        let children = result
            .references
            .as_ref()
            .map(|refs| {
                refs.iter()
                    .map(|r| {
                        BrowsedNode::new(
                            Self::from_ua_node_id(&r.node_id.node_id),
                            r.browse_name.name.as_ref().to_string(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        debug!(node = %node, children = result.references.as_ref().map_or(0, |r| r.len()), "Browsed");
        Ok(children)
    }

    async fn create_subscription(&self, publishing_interval: Duration) -> PlaneResult<u32> {
        let session = self.get_session()?;
        let tx = self.notifications.clone();

        let subscription_id = {
            let session = session.read();
            session
                .create_subscription(
                    publishing_interval.as_millis() as f64,
                    self.config.subscription.lifetime_count,
                    self.config.subscription.keepalive_count,
                    self.config.subscription.max_notifications_per_publish,
                    self.config.subscription.priority,
                    self.config.subscription.publishing_enabled,
                    DataChangeCallback::new(move |items| {
                        for item in items {
                            let node = Self::from_ua_node_id(&item.item_to_monitor().node_id);
                            let data_value = item.last_value().clone();
                            let source_timestamp =
                                data_value.source_timestamp.map(|t| t.as_chrono());
                            if let Some(value) =
                                data_value.value.as_ref().and_then(Self::from_variant)
                            {
                                let _ = tx.send(Notification {
                                    node,
                                    value,
                                    source_timestamp,
                                });
                            }
                        }
                    }),
                )
                .map_err(|e| PlaneError::subscription(format!("create: {}", e)))?
        };

        info!(subscription_id, "Subscription created");
        Ok(subscription_id)
    }

    async fn create_monitored_items(
        &self,
        subscription_id: u32,
        nodes: &[CoreNodeId],
        sampling_interval: Duration,
    ) -> PlaneResult<()> {
        if nodes.is_empty() {
            return Ok(());
        }
        let session = self.get_session()?;

        let items_to_create: Vec<MonitoredItemCreateRequest> = nodes
            .iter()
            .map(|node| MonitoredItemCreateRequest {
                item_to_monitor: ReadValueId {
                    node_id: Self::to_ua_node_id(node),
                    attribute_id: AttributeId::Value as u32,
                    index_range: opcua::types::UAString::null(),
                    data_encoding: opcua::types::QualifiedName::null(),
                },
                monitoring_mode: MonitoringMode::Reporting,
                requested_parameters: MonitoringParameters {
                    sampling_interval: sampling_interval.as_millis() as f64,
                    filter: ExtensionObject::null(),
                    queue_size: 10,
                    discard_oldest: true,
                    client_handle: self.next_client_handle.fetch_add(1, Ordering::SeqCst),
                },
            })
            .collect();

        let results = {
            let session = session.read();
            session
                .create_monitored_items(subscription_id, TimestampsToReturn::Both, &items_to_create)
                .map_err(|e| PlaneError::subscription(format!("monitored items: {}", e)))?
        };

        for (i, result) in results.iter().enumerate() {
            if !result.status_code.is_good() {
                warn!(
                    node = %nodes[i],
                    status = ?result.status_code,
                    "Monitored item rejected"
                );
            }
        }

        debug!(subscription_id, count = nodes.len(), "Monitored items created");
        Ok(())
    }

    fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

// =============================================================================
// Tests
// =============================================================================
