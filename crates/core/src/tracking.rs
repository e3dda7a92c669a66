// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Live technician positions and per-order push subscriptions.
//!
//! The hub keeps the live-location cache (one entry per technician, upserted
//! by key) and, for every order being tracked, a session with the job
//! coordinate, the technicians expected and those that already arrived.
//! Each open session owns a push loop that runs on its own timer and sends a
//! snapshot to the order's subscribers only when something moved, so slow
//! subscribers never hold back the simulator.

use crate::config::TrackingConfig;
use crate::error::CoreError;
use crate::events::{EventSender, FulfillmentEvent};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use fieldops_domain::{Coordinate, LiveLocation, OrderId, TechnicianId, TechnicianPosition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};
use uuid::Uuid;

/// Identifies one subscriber of one order.
pub type SubscriberId = Uuid;

/// Why a tracking channel was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// Every assigned technician reached the job.
    AllArrived,
    /// The order was completed or cancelled.
    OrderFinished,
}

/// Message delivered to tracking subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum TrackingMessage {
    /// Current position of every technician on the order.
    Snapshot {
        order_id: OrderId,
        positions: Vec<TechnicianPosition>,
    },
    /// No more messages will follow.
    Closed {
        order_id: OrderId,
        reason: CloseReason,
    },
}

/// What a single location update amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationUpdate {
    /// Stored, but the order has no open tracking session.
    Cached,
    /// Stored and queued for the next push.
    Moving,
    /// The technician is within the arrival threshold.
    Arrived,
    /// The technician arrived and was the last one; tracking closed.
    AllArrived,
}

impl LocationUpdate {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cached => "cached",
            Self::Moving => "moving",
            Self::Arrived => "arrived",
            Self::AllArrived => "all_arrived",
        }
    }
}

struct Session {
    job: Coordinate,
    technicians: BTreeSet<TechnicianId>,
    arrived: DashSet<TechnicianId>,
    dirty: AtomicBool,
    closed: AtomicBool,
    stop: CancellationToken,
}

impl Session {
    fn new(job: Coordinate, technicians: BTreeSet<TechnicianId>) -> Self {
        Self {
            job,
            technicians,
            arrived: DashSet::new(),
            dirty: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            stop: CancellationToken::new(),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn all_arrived(&self) -> bool {
        !self.technicians.is_empty()
            && self.technicians.iter().all(|t| self.arrived.contains(t))
    }
}

struct Subscriber {
    id: SubscriberId,
    tx: mpsc::Sender<TrackingMessage>,
}

struct HubState {
    locations: DashMap<TechnicianId, LiveLocation>,
    sessions: DashMap<OrderId, Arc<Session>>,
    /// Orders whose tracking ended because they were completed or cancelled.
    finished: DashSet<OrderId>,
    subscribers: DashMap<OrderId, Vec<Subscriber>>,
    events: EventSender,
    config: TrackingConfig,
}

impl HubState {
    fn snapshot(&self, order_id: OrderId) -> Vec<TechnicianPosition> {
        let mut positions: Vec<TechnicianPosition> = self
            .locations
            .iter()
            .filter(|entry| entry.order_id == order_id)
            .map(|entry| TechnicianPosition::from(entry.value()))
            .collect();
        positions.sort_by(|a, b| a.technician_id.cmp(&b.technician_id));
        positions
    }

    fn closed_reason(&self, order_id: OrderId) -> Option<CloseReason> {
        if self.finished.contains(&order_id) {
            return Some(CloseReason::OrderFinished);
        }
        self.sessions
            .get(&order_id)
            .filter(|session| session.is_closed())
            .map(|_| CloseReason::AllArrived)
    }

    /// Sends to every subscriber of the order without waiting.
    ///
    /// A full buffer skips that subscriber for this message; a closed one is
    /// dropped. Neither affects the others.
    fn broadcast(&self, order_id: OrderId, message: &TrackingMessage) {
        if let Some(mut subscribers) = self.subscribers.get_mut(&order_id) {
            subscribers.retain(|subscriber| match subscriber.tx.try_send(message.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    debug!(
                        %order_id,
                        subscriber = %subscriber.id,
                        "Subscriber lagging; snapshot skipped"
                    );
                    true
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(
                        %order_id,
                        subscriber = %subscriber.id,
                        "Subscriber gone; removing"
                    );
                    false
                }
            });
        }
    }

    fn push_snapshot(&self, order_id: OrderId) {
        let message: TrackingMessage = TrackingMessage::Snapshot {
            order_id,
            positions: self.snapshot(order_id),
        };
        self.broadcast(order_id, &message);
    }
}

/// Live-location cache plus per-order subscriber fan-out.
///
/// Cloning is cheap and every clone shares the same state.
#[derive(Clone)]
pub struct TrackingHub {
    state: Arc<HubState>,
    tasks: TaskTracker,
}

impl std::fmt::Debug for TrackingHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingHub")
            .field("locations", &self.state.locations.len())
            .field("sessions", &self.state.sessions.len())
            .field("finished", &self.state.finished.len())
            .field("subscribed_orders", &self.state.subscribers.len())
            .finish_non_exhaustive()
    }
}

impl TrackingHub {
    #[must_use]
    pub fn new(config: TrackingConfig, events: EventSender) -> Self {
        Self {
            state: Arc::new(HubState {
                locations: DashMap::new(),
                sessions: DashMap::new(),
                finished: DashSet::new(),
                subscribers: DashMap::new(),
                events,
                config,
            }),
            tasks: TaskTracker::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &TrackingConfig {
        &self.state.config
    }

    /// Puts a technician on the map for an order, typically at their home
    /// coordinate when the order is placed.
    pub fn seed_location(
        &self,
        technician_id: TechnicianId,
        order_id: OrderId,
        coordinate: Coordinate,
    ) {
        self.state.locations.insert(
            technician_id,
            LiveLocation {
                technician_id,
                order_id,
                coordinate,
            },
        );
    }

    /// Forgets a technician's live location if it belongs to `order_id`.
    pub fn clear_location(&self, technician_id: TechnicianId, order_id: OrderId) {
        self.state
            .locations
            .remove_if(&technician_id, |_, location| location.order_id == order_id);
    }

    #[must_use]
    pub fn location(&self, technician_id: TechnicianId) -> Option<LiveLocation> {
        self.state.locations.get(&technician_id).map(|entry| *entry.value())
    }

    /// Current positions of the order's technicians, ordered by technician id.
    #[must_use]
    pub fn snapshot(&self, order_id: OrderId) -> Vec<TechnicianPosition> {
        self.state.snapshot(order_id)
    }

    /// Starts tracking an order. Does nothing if it is already being tracked
    /// or has finished.
    pub fn open(&self, order_id: OrderId, job: Coordinate, technicians: BTreeSet<TechnicianId>) {
        if self.state.finished.contains(&order_id) {
            debug!(%order_id, "Order finished; tracking not reopened");
            return;
        }
        let session: Arc<Session> = match self.state.sessions.entry(order_id) {
            Entry::Occupied(entry) if !entry.get().is_closed() => return,
            Entry::Occupied(mut entry) => {
                let session: Arc<Session> = Arc::new(Session::new(job, technicians));
                entry.insert(Arc::clone(&session));
                session
            }
            Entry::Vacant(entry) => {
                let session: Arc<Session> = Arc::new(Session::new(job, technicians));
                entry.insert(Arc::clone(&session));
                session
            }
        };

        info!(%order_id, technicians = session.technicians.len(), "Tracking opened");
        self.spawn_push_loop(order_id, session);
    }

    fn spawn_push_loop(&self, order_id: OrderId, session: Arc<Session>) {
        let state: Arc<HubState> = Arc::clone(&self.state);
        let period: Duration = state.config.push_interval.max(Duration::from_millis(1));

        self.tasks.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    () = session.stop.cancelled() => break,
                    _ = ticker.tick() => {
                        if session.dirty.swap(false, Ordering::AcqRel) {
                            state.push_snapshot(order_id);
                        }
                    }
                }
            }
            debug!(%order_id, "Tracking push loop stopped");
        });
    }

    /// Returns true while the order has an open session.
    #[must_use]
    pub fn is_open(&self, order_id: OrderId) -> bool {
        self.state
            .sessions
            .get(&order_id)
            .is_some_and(|session| !session.is_closed())
    }

    /// Registers a subscriber for an order.
    ///
    /// The subscriber immediately receives the current snapshot. If tracking
    /// for the order already closed (everyone arrived, or the order finished)
    /// it receives the closing message instead and is not registered.
    ///
    /// The check and the registration happen under the order's subscriber
    /// entry, which [`TrackingHub::close`] also takes after marking the order
    /// closed, so a concurrent close either is seen here or sees this
    /// subscriber.
    pub fn subscribe(
        &self,
        order_id: OrderId,
        tx: mpsc::Sender<TrackingMessage>,
    ) -> SubscriberId {
        let id: SubscriberId = Uuid::new_v4();
        let positions: Vec<TechnicianPosition> = self.state.snapshot(order_id);

        let entry = self.state.subscribers.entry(order_id);
        if let Some(reason) = self.state.closed_reason(order_id) {
            let _ = tx.try_send(TrackingMessage::Closed { order_id, reason });
            return id;
        }

        let _ = tx.try_send(TrackingMessage::Snapshot {
            order_id,
            positions,
        });
        entry.or_default().push(Subscriber { id, tx });

        info!(%order_id, subscriber = %id, "Tracking subscriber added");
        id
    }

    /// Removes one subscriber; the others are untouched.
    pub fn unsubscribe(&self, order_id: OrderId, subscriber_id: SubscriberId) {
        if let Some(mut subscribers) = self.state.subscribers.get_mut(&order_id) {
            subscribers.retain(|s| s.id != subscriber_id);
        }
        self.state
            .subscribers
            .remove_if(&order_id, |_, subscribers| subscribers.is_empty());
    }

    /// Sends the closing message to every subscriber of the order and drops them.
    pub fn unsubscribe_all(&self, order_id: OrderId, reason: CloseReason) {
        if let Some((_, subscribers)) = self.state.subscribers.remove(&order_id) {
            let message: TrackingMessage = TrackingMessage::Closed { order_id, reason };
            for subscriber in subscribers {
                let _ = subscriber.tx.try_send(message.clone());
            }
        }
    }

    #[must_use]
    pub fn subscriber_count(&self, order_id: OrderId) -> usize {
        self.state
            .subscribers
            .get(&order_id)
            .map_or(0, |subscribers| subscribers.len())
    }

    /// Closes tracking for an order. Safe to call more than once.
    ///
    /// A session closed because everyone arrived is kept so arrival can still
    /// be queried; a finished order's session is dropped and the order is
    /// remembered as finished, so later subscribers are told so.
    pub fn close(&self, order_id: OrderId, reason: CloseReason) {
        if reason == CloseReason::OrderFinished {
            self.state.finished.insert(order_id);
        }
        let session: Option<Arc<Session>> = match reason {
            CloseReason::OrderFinished => self.state.sessions.remove(&order_id).map(|(_, s)| s),
            CloseReason::AllArrived => self
                .state
                .sessions
                .get(&order_id)
                .map(|s| Arc::clone(s.value())),
        };

        if let Some(session) = session {
            session.stop.cancel();
            if !session.closed.swap(true, Ordering::AcqRel) {
                info!(%order_id, ?reason, "Tracking closed");
            }
        }

        self.unsubscribe_all(order_id, reason);
    }

    /// Records a reported or simulated position.
    ///
    /// The technician must have a live location (seeded when they were
    /// assigned); the update never recreates one that was cleared. If the
    /// order is tracked, the position is queued for the next push and
    /// checked against the arrival threshold.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::TechnicianNotTracked` if the technician has no
    /// live location.
    pub fn update_location(
        &self,
        technician_id: TechnicianId,
        coordinate: Coordinate,
    ) -> Result<LocationUpdate, CoreError> {
        let order_id: OrderId = {
            let mut entry = self
                .state
                .locations
                .get_mut(&technician_id)
                .ok_or(CoreError::TechnicianNotTracked(technician_id))?;
            entry.coordinate = coordinate;
            entry.order_id
        };
        debug!(
            %technician_id,
            %order_id,
            lat = coordinate.latitude(),
            lon = coordinate.longitude(),
            "Location updated"
        );

        let Some(session) = self.open_session(order_id) else {
            return Ok(LocationUpdate::Cached);
        };
        session.dirty.store(true, Ordering::Release);

        let within: bool = session.technicians.contains(&technician_id)
            && coordinate.is_within(&session.job, self.state.config.arrival_threshold_km);
        if within {
            return Ok(self.record_arrival(order_id, &session, technician_id));
        }
        Ok(LocationUpdate::Moving)
    }

    /// Marks a technician as arrived regardless of distance, used when a
    /// simulated route ends.
    pub fn mark_arrived(&self, order_id: OrderId, technician_id: TechnicianId) -> LocationUpdate {
        match self.open_session(order_id) {
            Some(session) if session.technicians.contains(&technician_id) => {
                self.record_arrival(order_id, &session, technician_id)
            }
            _ => LocationUpdate::Cached,
        }
    }

    /// Returns true once every technician expected on the order arrived.
    #[must_use]
    pub fn all_arrived(&self, order_id: OrderId) -> bool {
        self.state
            .sessions
            .get(&order_id)
            .is_some_and(|session| session.all_arrived())
    }

    fn open_session(&self, order_id: OrderId) -> Option<Arc<Session>> {
        self.state
            .sessions
            .get(&order_id)
            .filter(|session| !session.is_closed())
            .map(|session| Arc::clone(session.value()))
    }

    fn record_arrival(
        &self,
        order_id: OrderId,
        session: &Session,
        technician_id: TechnicianId,
    ) -> LocationUpdate {
        if session.arrived.insert(technician_id) {
            info!(%order_id, %technician_id, "Technician arrived");
            self.state.events.emit(FulfillmentEvent::TechnicianArrived {
                order_id,
                technician_id,
            });
        }

        if session.all_arrived() {
            // Last position goes out before the channel closes.
            self.state.push_snapshot(order_id);
            self.close(order_id, CloseReason::AllArrived);
            return LocationUpdate::AllArrived;
        }
        LocationUpdate::Arrived
    }

    /// Stops every push loop and waits for them to exit.
    pub async fn shutdown(&self) {
        for session in &self.state.sessions {
            session.stop.cancel();
        }
        self.tasks.close();
        self.tasks.wait().await;
    }
}
