use serde::{Deserialize, Serialize};

pub const BYTES_PER_MEGABYTE: u64 = 1_048_576;

/// Global accounting of bytes reserved by live data sources.
///
/// `consume` is an optimistic reservation made when a source is accepted;
/// `reconcile` replaces the running total with a fresh sum over everything
/// still alive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryBudget {
    limit_bytes: u64,
    total_bytes: u64,
    available_bytes: u64,
    used_ratio: f32,
}

impl MemoryBudget {
    pub fn new(limit_bytes: u64) -> Self {
        let mut budget = Self {
            limit_bytes,
            total_bytes: 0,
            available_bytes: limit_bytes,
            used_ratio: 0.0,
        };
        budget.refresh();
        budget
    }

    pub fn from_megabytes(megabytes: u32) -> Self {
        Self::new(u64::from(megabytes) * BYTES_PER_MEGABYTE)
    }

    /// Adds `bytes` to the running total. A zero delta only refreshes the
    /// derived figures.
    pub fn consume(&mut self, bytes: u64) {
        self.total_bytes = self.total_bytes.saturating_add(bytes);
        self.refresh();
    }

    pub fn reconcile(&mut self, total_bytes: u64) {
        self.total_bytes = total_bytes;
        self.refresh();
    }

    pub fn can_fit(&self, bytes: u64) -> bool {
        bytes <= self.available_bytes
    }

    pub fn limit_bytes(&self) -> u64 {
        self.limit_bytes
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn available_bytes(&self) -> u64 {
        self.available_bytes
    }

    /// `total / max(1, limit)`, clamped to `[0, 1]`.
    pub fn used_ratio(&self) -> f32 {
        self.used_ratio
    }

    fn refresh(&mut self) {
        self.available_bytes = self.limit_bytes.saturating_sub(self.total_bytes);
        let limit = (self.limit_bytes as f64).max(1.0);
        self.used_ratio = (self.total_bytes as f64 / limit).clamp(0.0, 1.0) as f32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_tracks_consumption() {
        let mut budget = MemoryBudget::new(1000);
        budget.consume(250);
        budget.consume(250);
        assert_eq!(budget.total_bytes(), 500);
        assert_eq!(budget.available_bytes(), 500);
        assert!((budget.used_ratio() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_ratio_clamps_when_over_budget() {
        let mut budget = MemoryBudget::new(100);
        budget.consume(300);
        assert_eq!(budget.used_ratio(), 1.0);
        assert_eq!(budget.available_bytes(), 0);
        assert!(!budget.can_fit(1));
    }

    #[test]
    fn test_zero_limit_does_not_divide_by_zero() {
        let mut budget = MemoryBudget::new(0);
        budget.consume(0);
        assert_eq!(budget.used_ratio(), 0.0);
        budget.consume(1);
        assert_eq!(budget.used_ratio(), 1.0);
    }

    #[test]
    fn test_zero_delta_only_refreshes() {
        let mut budget = MemoryBudget::from_megabytes(4);
        budget.consume(1024);
        let before = budget;
        budget.consume(0);
        assert_eq!(budget, before);
    }

    #[test]
    fn test_reconcile_replaces_total() {
        let mut budget = MemoryBudget::from_megabytes(1);
        budget.consume(900_000);
        budget.reconcile(1024);
        assert_eq!(budget.total_bytes(), 1024);
        assert_eq!(budget.available_bytes(), BYTES_PER_MEGABYTE - 1024);
    }
}
