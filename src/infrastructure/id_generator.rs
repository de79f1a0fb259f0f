// Snowflake-style record ids shared by every table.
// 64-bit layout: [millis since EPOCH:41][node:10][sequence:12]

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// 2024-01-01T00:00:00Z
const EPOCH_MILLIS: u64 = 1_704_067_200_000;
const NODE_BITS: u64 = 10;
const SEQUENCE_BITS: u64 = 12;
const MAX_SEQUENCE: u64 = (1 << SEQUENCE_BITS) - 1;
pub const MAX_NODE_ID: u16 = (1 << NODE_BITS) - 1;

#[derive(Debug)]
struct GeneratorState {
    last_millis: u64,
    sequence: u64,
}

#[derive(Debug)]
pub struct IdGenerator {
    node_id: u16,
    state: Mutex<GeneratorState>,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(EPOCH_MILLIS)
        .saturating_sub(EPOCH_MILLIS)
}

impl IdGenerator {
    pub fn new(node_id: u16) -> Self {
        Self {
            node_id: node_id.min(MAX_NODE_ID),
            state: Mutex::new(GeneratorState {
                last_millis: 0,
                sequence: 0,
            }),
        }
    }

    pub fn node_id(&self) -> u16 {
        self.node_id
    }

    pub fn next_id(&self) -> i64 {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut millis = now_millis().max(state.last_millis);
        if millis == state.last_millis {
            state.sequence = (state.sequence + 1) & MAX_SEQUENCE;
            if state.sequence == 0 {
                // Sequence exhausted for this millisecond; borrow the next one.
                millis += 1;
            }
        } else {
            state.sequence = 0;
        }
        state.last_millis = millis;

        ((millis << (NODE_BITS + SEQUENCE_BITS))
            | ((self.node_id as u64) << SEQUENCE_BITS)
            | state.sequence) as i64
    }

    pub fn extract_node_id(id: i64) -> u16 {
        ((id as u64 >> SEQUENCE_BITS) & MAX_NODE_ID as u64) as u16
    }

    pub fn extract_sequence(id: i64) -> u64 {
        id as u64 & MAX_SEQUENCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let generator = IdGenerator::new(7);
        let ids: Vec<i64> = (0..10_000).map(|_| generator.next_id()).collect();

        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert!(ids.iter().all(|id| *id > 0));
    }

    #[test]
    fn test_node_extraction() {
        let generator = IdGenerator::new(500);
        let id = generator.next_id();
        assert_eq!(IdGenerator::extract_node_id(id), 500);
        assert_eq!(generator.node_id(), 500);
    }

    #[test]
    fn test_node_id_is_clamped() {
        let generator = IdGenerator::new(u16::MAX);
        assert_eq!(generator.node_id(), MAX_NODE_ID);
    }
}
