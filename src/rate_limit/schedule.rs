use chrono::Duration;

/// Escalating block lengths for repeat offenders.
///
/// Indexed by how far an identifier has overshot its allowance
/// (`count - max_attempts`); anything past the end uses the last tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutSchedule {
    tiers: Vec<Duration>,
}

impl Default for LockoutSchedule {
    /// 1, 5, 15, 30 and 60 minutes.
    fn default() -> Self {
        Self {
            tiers: vec![
                Duration::minutes(1),
                Duration::minutes(5),
                Duration::minutes(15),
                Duration::minutes(30),
                Duration::minutes(60),
            ],
        }
    }
}

impl LockoutSchedule {
    /// Custom tiers. An empty list falls back to the default schedule.
    pub fn custom(tiers: Vec<Duration>) -> Self {
        if tiers.is_empty() {
            return Self::default();
        }
        Self { tiers }
    }

    /// Block for the `overflow`-th attempt past the allowance, clamped to the last tier.
    pub fn block_duration(&self, overflow: u32) -> Duration {
        let index = usize::try_from(overflow).unwrap_or(usize::MAX);
        self.tiers
            .get(index)
            .or_else(|| self.tiers.last())
            .copied()
            .unwrap_or_else(|| Duration::minutes(1))
    }

    /// The longest block the schedule imposes.
    pub fn ceiling(&self) -> Duration {
        self.tiers.last().copied().unwrap_or_else(|| Duration::minutes(1))
    }
}
