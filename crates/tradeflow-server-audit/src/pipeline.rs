// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{instrument, warn};
use tradeflow_server_auth::AuditEvent;
use tradeflow_server_config::{AuditConfig, QueueOverflowPolicy};

use crate::error::{AuditError, AuditResult};
use crate::filter::AuditFilterConfig;
use crate::sink::AuditSink;

/// Smallest per-sink worker queue, regardless of the main queue capacity.
const MIN_SINK_QUEUE_CAPACITY: usize = 1024;

/// Bounded queue in front of the audit sinks.
///
/// A single background task drains the queue in FIFO order, applies the
/// global filter and forwards each surviving event to one worker per sink.
/// Each worker publishes its events one at a time, so every sink sees events
/// in the order they were logged. A stalled sink only fills its own worker
/// queue. Must be constructed inside a Tokio runtime.
pub struct AuditService {
	intake: Intake,
}

enum Intake {
	/// Rejects events once the queue is full.
	Bounded(mpsc::Sender<AuditEvent>),
	/// Feeds a single forwarder that waits for queue capacity in log order.
	Ordered(mpsc::UnboundedSender<AuditEvent>),
}

struct SinkWorker {
	sink: Arc<dyn AuditSink>,
	tx: mpsc::Sender<Arc<AuditEvent>>,
}

impl AuditService {
	pub fn new(
		global_filter: AuditFilterConfig,
		queue_capacity: usize,
		overflow_policy: QueueOverflowPolicy,
		sinks: Vec<Arc<dyn AuditSink>>,
	) -> Self {
		let capacity = queue_capacity.max(1);
		let (tx, rx) = mpsc::channel(capacity);

		let workers = sinks
			.into_iter()
			.map(|sink| {
				let (worker_tx, worker_rx) = mpsc::channel(capacity.max(MIN_SINK_QUEUE_CAPACITY));
				tokio::spawn(Self::sink_worker(Arc::clone(&sink), worker_rx));
				SinkWorker { sink, tx: worker_tx }
			})
			.collect();

		tokio::spawn(Self::background_task(rx, global_filter, workers));

		let intake = match overflow_policy {
			QueueOverflowPolicy::DropNewest => Intake::Bounded(tx),
			QueueOverflowPolicy::Block => {
				let (intake_tx, intake_rx) = mpsc::unbounded_channel();
				tokio::spawn(Self::forwarder(intake_rx, tx));
				Intake::Ordered(intake_tx)
			}
		};

		Self { intake }
	}

	pub fn from_config(config: &AuditConfig, sinks: Vec<Arc<dyn AuditSink>>) -> AuditResult<Self> {
		let filter = AuditFilterConfig::from_config(config)?;
		Ok(Self::new(
			filter,
			config.queue_capacity,
			config.queue_overflow_policy,
			sinks,
		))
	}

	async fn forwarder(mut intake: mpsc::UnboundedReceiver<AuditEvent>, tx: mpsc::Sender<AuditEvent>) {
		while let Some(event) = intake.recv().await {
			let event_id = event.id;
			if tx.send(event).await.is_err() {
				warn!(
					error_kind = "AuditWriteFailure",
					%event_id,
					"audit queue closed, dropping event"
				);
				break;
			}
		}
	}

	async fn background_task(
		mut rx: mpsc::Receiver<AuditEvent>,
		global_filter: AuditFilterConfig,
		workers: Vec<SinkWorker>,
	) {
		while let Some(event) = rx.recv().await {
			if !global_filter.allows(&event) {
				continue;
			}

			let event = Arc::new(event);

			for worker in &workers {
				if !worker.sink.filter().allows(&event) {
					continue;
				}

				if let Err(e) = worker.tx.try_send(Arc::clone(&event)) {
					let reason = match e {
						TrySendError::Full(_) => "sink queue full",
						TrySendError::Closed(_) => "sink worker stopped",
					};
					warn!(
						error_kind = "AuditWriteFailure",
						sink = worker.sink.name(),
						event_id = %event.id,
						reason,
						"audit event not delivered to sink"
					);
				}
			}
		}
	}

	async fn sink_worker(sink: Arc<dyn AuditSink>, mut rx: mpsc::Receiver<Arc<AuditEvent>>) {
		while let Some(event) = rx.recv().await {
			if let Err(e) = sink.publish(event).await {
				warn!(sink = sink.name(), error = %e, "audit sink publish failed");
			}
		}
	}

	/// Queue an event without waiting for any sink.
	///
	/// - `Block`: hands the event to the ordered forwarder, so the caller never waits but the event is kept
	/// - `DropNewest`: rejects the event with [`AuditError::QueueFull`] when the queue is full
	#[instrument(skip(self, event), fields(event_type = %event.event_type, event_id = %event.id))]
	pub fn log(&self, event: AuditEvent) -> AuditResult<()> {
		match &self.intake {
			Intake::Ordered(tx) => tx.send(event).map_err(|_| AuditError::Shutdown),
			Intake::Bounded(tx) => tx.try_send(event).map_err(|e| match e {
				TrySendError::Full(_) => AuditError::QueueFull,
				TrySendError::Closed(_) => AuditError::Shutdown,
			}),
		}
	}
}
