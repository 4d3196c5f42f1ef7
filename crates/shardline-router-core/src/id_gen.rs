//! Shard-aware identifier generation
//!
//! Every physical table is an independent auto-increment space, so ids are
//! assigned before routing instead. Layout of a generated id:
//!
//! ```text
//! | 41 bits millis since ID_EPOCH | 10 bits worker | 12 bits sequence |
//! ```
//!
//! Ids are strictly increasing per logical entity within one process and
//! unique across processes with distinct worker ids. No global ordering
//! across processes is promised.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use shardline_types::current_millis;

/// 2024-01-01T00:00:00Z
pub const ID_EPOCH_MILLIS: i64 = 1_704_067_200_000;

const SEQUENCE_BITS: u32 = 12;
const WORKER_BITS: u32 = 10;
const MAX_SEQUENCE: u16 = (1 << SEQUENCE_BITS) - 1;

/// Largest accepted worker id
pub const MAX_WORKER_ID: u16 = (1 << WORKER_BITS) - 1;

#[derive(Debug)]
struct SequenceState {
    last_millis: i64,
    sequence: u16,
    /// Starting sequence for the next new millisecond
    vibration: u16,
}

/// Per-entity id generator
pub struct IdGenerator {
    worker_id: u16,
    max_vibration_offset: u16,
    clock: fn() -> i64,
    sequences: RwLock<HashMap<String, Arc<Mutex<SequenceState>>>>,
}

impl IdGenerator {
    /// Create a generator for `worker_id`
    ///
    /// Out-of-range values are clamped: the worker id to 10 bits, the
    /// vibration offset to the sequence range.
    pub fn new(worker_id: u16, max_vibration_offset: u16) -> Self {
        if worker_id > MAX_WORKER_ID {
            warn!(worker_id, max = MAX_WORKER_ID, "Worker id out of range, clamping");
        }
        Self {
            worker_id: worker_id.min(MAX_WORKER_ID),
            max_vibration_offset: max_vibration_offset.min(MAX_SEQUENCE),
            clock: current_millis,
            sequences: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the wall clock, used to exercise clock edge cases
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn worker_id(&self) -> u16 {
        self.worker_id
    }

    pub fn max_vibration_offset(&self) -> u16 {
        self.max_vibration_offset
    }

    /// Next id for a logical entity
    pub fn next_id(&self, entity: &str) -> i64 {
        let state = self.state_for(entity);
        let mut s = state.lock();

        let now = ((self.clock)() - ID_EPOCH_MILLIS).max(0);
        if now > s.last_millis {
            s.vibration = if s.vibration >= self.max_vibration_offset {
                0
            } else {
                s.vibration + 1
            };
            s.last_millis = now;
            s.sequence = s.vibration;
        } else if s.sequence < MAX_SEQUENCE {
            // Same millisecond, or the clock moved backwards
            s.sequence += 1;
        } else {
            // Sequence exhausted, borrow the next millisecond
            s.last_millis += 1;
            s.sequence = 0;
        }

        compose(s.last_millis, self.worker_id, s.sequence)
    }

    /// Business order number: `ORDER` + millis + 8 random hex chars
    pub fn next_order_no(&self) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("ORDER{}{}", (self.clock)(), &suffix[..8])
    }

    fn state_for(&self, entity: &str) -> Arc<Mutex<SequenceState>> {
        if let Some(state) = self.sequences.read().get(entity) {
            return state.clone();
        }

        let mut sequences = self.sequences.write();
        sequences
            .entry(entity.to_string())
            .or_insert_with(|| {
                debug!(entity = %entity, worker_id = self.worker_id, "Id sequence created");
                Arc::new(Mutex::new(SequenceState {
                    last_millis: -1,
                    sequence: 0,
                    vibration: self.max_vibration_offset,
                }))
            })
            .clone()
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(0, 1)
    }
}

fn compose(millis: i64, worker_id: u16, sequence: u16) -> i64 {
    (millis << (WORKER_BITS + SEQUENCE_BITS))
        | ((worker_id as i64) << SEQUENCE_BITS)
        | sequence as i64
}

/// Split an id into (millis since `ID_EPOCH_MILLIS`, worker id, sequence)
pub fn decompose(id: i64) -> (i64, u16, u16) {
    let millis = id >> (WORKER_BITS + SEQUENCE_BITS);
    let worker = ((id >> SEQUENCE_BITS) & MAX_WORKER_ID as i64) as u16;
    let sequence = (id & MAX_SEQUENCE as i64) as u16;
    (millis, worker, sequence)
}
