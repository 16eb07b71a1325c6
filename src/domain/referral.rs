use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Deepest referral generation that earns commission.
pub const MAX_GENERATION: u8 = 4;

/// A referral generation, 1 (direct) through [`MAX_GENERATION`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Generation(u8);

impl Generation {
    pub fn new(level: u8) -> Option<Self> {
        (1..=MAX_GENERATION).contains(&level).then_some(Self(level))
    }

    pub fn level(&self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = Generation> {
        (1..=MAX_GENERATION).map(Generation)
    }
}

impl<'de> Deserialize<'de> for Generation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level = u8::deserialize(deserializer)?;
        Generation::new(level).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "referral generation must be between 1 and {MAX_GENERATION}, got {level}"
            ))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation: Generation,
    pub referrals: u32,
    #[serde(default)]
    pub active_referrals: u32,
    #[serde(default)]
    pub commission: Decimal,
}

/// Aggregated referral statistics for one pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackStats {
    pub pack_id: u64,
    #[serde(default)]
    pub pack_name: Option<String>,
    pub generations: Vec<GenerationStats>,
}

impl PackStats {
    pub fn total_referrals(&self) -> u32 {
        self.generations.iter().map(|g| g.referrals).sum()
    }

    pub fn total_commission(&self) -> Decimal {
        self.generations.iter().map(|g| g.commission).sum()
    }

    /// Stats for `generation`, zeroed when the server omitted it.
    pub fn generation(&self, generation: Generation) -> GenerationStats {
        self.generations
            .iter()
            .find(|g| g.generation == generation)
            .cloned()
            .unwrap_or(GenerationStats {
                generation,
                referrals: 0,
                active_referrals: 0,
                commission: Decimal::ZERO,
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Referral {
    pub id: u64,
    pub name: String,
    pub generation: Generation,
    #[serde(default)]
    pub pack_name: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub joined_at: Option<String>,
}

/// Keeps the referrals of one generation, or all of them when `generation` is `None`.
pub fn filter_generation(referrals: Vec<Referral>, generation: Option<Generation>) -> Vec<Referral> {
    match generation {
        Some(g) => referrals.into_iter().filter(|r| r.generation == g).collect(),
        None => referrals,
    }
}
