// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Event-stream sink seam.
//!
//! Publishes are best-effort, fire-and-continue: a failed publish is logged
//! and collection proceeds, watermarks included. The production Event Hubs
//! client implements this trait out of tree; this crate ships a no-op sink
//! and a tracing sink for development.

use async_trait::async_trait;

use crate::envelope::{EnvelopeMetadata, MacManEnvelope};
use crate::error::SinkError;

/// A destination for MacMan record batches.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Publishes one screen's batch with its metadata properties.
    async fn publish(
        &self,
        batch: &[MacManEnvelope],
        metadata: &EnvelopeMetadata,
    ) -> Result<(), SinkError>;
}

/// Discards every batch. Used when the event stream is disabled.
#[derive(Debug, Default)]
pub struct NoopSink;

#[async_trait]
impl EventSink for NoopSink {
    async fn publish(
        &self,
        batch: &[MacManEnvelope],
        metadata: &EnvelopeMetadata,
    ) -> Result<(), SinkError> {
        tracing::debug!(
            machine = %metadata.machine_name,
            screen = %metadata.measurement_type,
            records = batch.len(),
            "Event stream disabled, dropping batch"
        );
        Ok(())
    }
}

/// Serializes every envelope to the log at info level. A stand-in sink for
/// environments where the stream credentials exist but no client is linked.
#[derive(Debug, Default)]
pub struct TracingSink;

#[async_trait]
impl EventSink for TracingSink {
    async fn publish(
        &self,
        batch: &[MacManEnvelope],
        metadata: &EnvelopeMetadata,
    ) -> Result<(), SinkError> {
        for envelope in batch {
            let body = serde_json::to_string(envelope)
                .map_err(|e| SinkError::publish_failed(e.to_string()))?;
            tracing::info!(
                machine = %metadata.machine_name,
                screen = %metadata.measurement_type,
                %body,
                "MacMan record"
            );
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
