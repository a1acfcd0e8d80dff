use serde::{Deserialize, Serialize};

/// Frame counter of a tracer session. Advances once per host tick,
/// whether or not the tick was sampled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tick {
    pub frame: u64,
}

impl Tick {
    pub fn new() -> Self {
        Tick { frame: 0 }
    }

    pub fn next(&self) -> Self {
        Tick { frame: self.frame + 1 }
    }

    /// Sample frequency gate. A frequency of zero is treated as one.
    pub fn is_sample_frame(&self, sample_frequency: u32) -> bool {
        self.frame % u64::from(sample_frequency.max(1)) == 0
    }
}
