// src/render/pool.rs

//! Bounded pool of rendering contexts.
//!
//! Membership lives behind a `std::sync::Mutex` that only guards in-memory
//! bookkeeping; creating and closing contexts happens outside the lock.
//! A context is reused while it has spare page capacity and has not used up
//! its lifetime budget. When the pool is full, the oldest idle context is
//! evicted (FIFO) to make room. The number of live contexts plus contexts
//! being created never exceeds `max_contexts`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Notify;

use crate::error::{AppError, Result};
use crate::render::engine::{RenderContext, RenderEngine};

/// Pool sizing.
#[derive(Debug, Clone, Copy)]
pub struct PoolLimits {
    pub max_contexts: usize,
    /// Concurrent page sessions per context before another context is preferred
    pub pages_per_context: usize,
    /// Pages a context may serve over its lifetime before it is recycled
    pub max_uses: u64,
}

struct PoolSlot {
    id: u64,
    context: Arc<dyn RenderContext>,
    active: AtomicUsize,
    uses: AtomicU64,
    closed: AtomicBool,
}

impl PoolSlot {
    fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    fn has_capacity(&self, limits: &PoolLimits) -> bool {
        self.context.is_alive()
            && self.active() < limits.pages_per_context
            && self.uses.load(Ordering::Acquire) < limits.max_uses
    }

    fn lease(self: &Arc<Self>) -> ContextLease {
        self.active.fetch_add(1, Ordering::AcqRel);
        self.uses.fetch_add(1, Ordering::AcqRel);
        ContextLease {
            slot: Arc::clone(self),
        }
    }

    /// Close the underlying context at most once.
    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.context.close().await {
            log::warn!("Failed to close rendering context {}: {}", self.id, e);
        }
    }
}

/// A borrowed context. Dropping the lease returns the page slot to the pool.
pub struct ContextLease {
    slot: Arc<PoolSlot>,
}

impl ContextLease {
    pub fn context(&self) -> &Arc<dyn RenderContext> {
        &self.slot.context
    }

    pub fn context_id(&self) -> u64 {
        self.slot.id
    }
}

impl Drop for ContextLease {
    fn drop(&mut self) {
        self.slot.active.fetch_sub(1, Ordering::AcqRel);
    }
}

#[derive(Default)]
struct PoolState {
    slots: VecDeque<Arc<PoolSlot>>,
    /// Contexts being created right now; they count against the bound.
    pending: usize,
    shut_down: bool,
}

enum Plan<'a> {
    Reuse(ContextLease),
    Create(Reservation<'a>),
    Wait,
}

/// A claimed creation slot. Counts against `max_contexts` until it is
/// fulfilled or dropped, so an abandoned creation frees its slot.
struct Reservation<'a> {
    pool: &'a ContextPool,
    armed: bool,
}

impl<'a> Reservation<'a> {
    fn claim(pool: &'a ContextPool, state: &mut PoolState) -> Self {
        state.pending += 1;
        Self { pool, armed: true }
    }

    /// Settle the reservation while the caller holds the lock.
    fn settle(mut self, state: &mut PoolState) {
        state.pending -= 1;
        self.armed = false;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        {
            let mut state = self.pool.lock();
            state.pending = state.pending.saturating_sub(1);
        }
        self.pool.ready.notify_waiters();
    }
}

/// Bounded, shared set of rendering contexts.
pub struct ContextPool {
    limits: PoolLimits,
    state: Mutex<PoolState>,
    ready: Notify,
    next_id: AtomicU64,
}

impl ContextPool {
    pub fn new(limits: PoolLimits) -> Self {
        let limits = PoolLimits {
            max_contexts: limits.max_contexts.max(1),
            pages_per_context: limits.pages_per_context.max(1),
            max_uses: limits.max_uses.max(1),
        };
        Self {
            limits,
            state: Mutex::new(PoolState::default()),
            ready: Notify::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn limits(&self) -> PoolLimits {
        self.limits
    }

    /// Number of live pooled contexts.
    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        // Bookkeeping stays consistent even if a holder panicked.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Borrow a context, creating one through `engine` when needed.
    pub async fn acquire(&self, engine: &dyn RenderEngine) -> Result<ContextLease> {
        loop {
            let notified = self.ready.notified();
            let mut retired = Vec::new();

            let plan = {
                let mut state = self.lock();
                if state.shut_down {
                    return Err(AppError::automation("context pool is shut down"));
                }

                // Drop contexts that died underneath us.
                let (alive, dead): (VecDeque<_>, VecDeque<_>) = state
                    .slots
                    .drain(..)
                    .partition(|slot| slot.context.is_alive());
                state.slots = alive;
                retired.extend(dead);

                self.plan(&mut state, &mut retired)
            };

            for slot in retired {
                log::debug!("Closing rendering context {}", slot.id);
                slot.close().await;
            }

            match plan {
                Plan::Reuse(lease) => {
                    log::debug!("Reusing rendering context {}", lease.context_id());
                    return Ok(lease);
                }
                Plan::Create(reservation) => return self.create(engine, reservation).await,
                Plan::Wait => notified.await,
            }
        }
    }

    fn plan(&self, state: &mut PoolState, retired: &mut Vec<Arc<PoolSlot>>) -> Plan<'_> {
        let limits = &self.limits;

        if let Some(slot) = state
            .slots
            .iter()
            .filter(|slot| slot.has_capacity(limits))
            .min_by_key(|slot| slot.active())
        {
            return Plan::Reuse(slot.lease());
        }

        if state.slots.len() + state.pending < limits.max_contexts {
            return Plan::Create(Reservation::claim(self, state));
        }

        // Full: evict the oldest idle context.
        if let Some(index) = state.slots.iter().position(|slot| slot.active() == 0) {
            if let Some(victim) = state.slots.remove(index) {
                log::debug!("Evicting rendering context {} (pool full)", victim.id);
                retired.push(victim);
                return Plan::Create(Reservation::claim(self, state));
            }
        }

        // Every context is busy: share the least loaded one rather than exceed the bound.
        if let Some(slot) = state.slots.iter().min_by_key(|slot| slot.active()) {
            return Plan::Reuse(slot.lease());
        }

        Plan::Wait
    }

    async fn create(
        &self,
        engine: &dyn RenderEngine,
        reservation: Reservation<'_>,
    ) -> Result<ContextLease> {
        let created = engine.new_context().await;

        let result = {
            let mut state = self.lock();
            reservation.settle(&mut state);
            match created {
                Ok(context) if !state.shut_down => {
                    let slot = Arc::new(PoolSlot {
                        id: self.next_id.fetch_add(1, Ordering::Relaxed),
                        context,
                        active: AtomicUsize::new(0),
                        uses: AtomicU64::new(0),
                        closed: AtomicBool::new(false),
                    });
                    let lease = slot.lease();
                    state.slots.push_back(slot);
                    Ok(lease)
                }
                Ok(context) => Err(context),
                Err(e) => {
                    self.ready.notify_waiters();
                    return Err(e);
                }
            }
        };
        self.ready.notify_waiters();

        match result {
            Ok(lease) => {
                log::debug!("Created rendering context {}", lease.context_id());
                Ok(lease)
            }
            Err(orphan) => {
                // Shutdown raced with creation.
                if let Err(e) = orphan.close().await {
                    log::warn!("Failed to close orphaned rendering context: {}", e);
                }
                Err(AppError::automation("context pool is shut down"))
            }
        }
    }

    /// Remove a context that failed at the engine level and close it.
    pub async fn discard(&self, lease: ContextLease) {
        let id = lease.context_id();
        let removed = {
            let mut state = self.lock();
            state
                .slots
                .iter()
                .position(|slot| slot.id == id)
                .and_then(|index| state.slots.remove(index))
        };
        let slot = Arc::clone(&lease.slot);
        drop(lease);

        if removed.is_some() {
            log::warn!("Discarding rendering context {} after engine failure", id);
        }
        slot.close().await;
        self.ready.notify_waiters();
    }

    /// Close every pooled context and refuse further acquisitions.
    pub async fn shutdown(&self) {
        let slots: Vec<_> = {
            let mut state = self.lock();
            state.shut_down = true;
            state.slots.drain(..).collect()
        };
        for slot in slots {
            slot.close().await;
        }
        self.ready.notify_waiters();
    }
}
