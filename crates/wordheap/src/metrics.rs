//! Heap and collection statistics.

use std::time::Duration;

/// Outcome of one mark-sweep cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectStats {
    /// Chunks released by the sweep.
    pub chunks_reclaimed: usize,
    /// Words returned to the free list.
    pub words_reclaimed: usize,
    /// Chunks still allocated after the cycle.
    pub chunks_surviving: usize,
    /// Words still allocated after the cycle.
    pub words_surviving: usize,
    /// Candidate words examined, roots and heap contents together.
    pub words_scanned: usize,
    /// Time spent marking.
    pub mark_duration: Duration,
    /// Time spent sweeping.
    pub sweep_duration: Duration,
    /// Collections run by this heap so far, this one included.
    pub total_collections: usize,
}

impl CollectStats {
    /// Total pause for this cycle.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.mark_duration + self.sweep_duration
    }

    /// Whether the cycle released anything.
    #[must_use]
    pub const fn reclaimed_any(&self) -> bool {
        self.chunks_reclaimed > 0
    }
}

/// Point-in-time snapshot of heap occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Arena size in words.
    pub capacity_words: usize,
    /// Words in live chunks.
    pub allocated_words: usize,
    /// Words in free chunks.
    pub free_words: usize,
    /// Number of live chunks.
    pub allocated_chunks: usize,
    /// Number of free chunks (not necessarily coalesced).
    pub free_chunks: usize,
    /// Largest single free chunk, in words.
    pub largest_free_words: usize,
}

impl HeapStats {
    /// Fraction of the arena currently allocated, in `[0, 1]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn occupancy(&self) -> f64 {
        if self.capacity_words == 0 {
            return 0.0;
        }
        self.allocated_words as f64 / self.capacity_words as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_sums_phases() {
        let stats = CollectStats {
            mark_duration: Duration::from_micros(3),
            sweep_duration: Duration::from_micros(4),
            ..CollectStats::default()
        };
        assert_eq!(stats.duration(), Duration::from_micros(7));
        assert!(!stats.reclaimed_any());
    }

    #[test]
    fn occupancy_of_empty_and_half_full() {
        assert!(HeapStats::default().occupancy().abs() < f64::EPSILON);
        let stats = HeapStats {
            capacity_words: 10,
            allocated_words: 5,
            ..HeapStats::default()
        };
        assert!((stats.occupancy() - 0.5).abs() < f64::EPSILON);
    }
}
