use std::cmp::Reverse;

use enum_map::EnumMap;
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};

use super::{
    rating::{ParseError, RatingCalculator},
    schema::{RatingValue, ScoreGeneration, ScoreRecord},
};

/// How many best scores of each generation count toward the total.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSizes {
    pub deluxe: usize,
    pub standard: usize,
}

impl Default for PoolSizes {
    fn default() -> Self {
        Self {
            deluxe: 15,
            standard: 25,
        }
    }
}

impl PoolSizes {
    pub fn get(self, generation: ScoreGeneration) -> usize {
        match generation {
            ScoreGeneration::Standard => self.standard,
            ScoreGeneration::Deluxe => self.deluxe,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Getters, CopyGetters)]
pub struct RatedScore<'a> {
    #[getset(get_copy = "pub")]
    record: &'a ScoreRecord,
    #[getset(get_copy = "pub")]
    rating: RatingValue,
}

#[derive(Clone, Debug, Default, Serialize, Getters, CopyGetters)]
pub struct RankedPool<'a> {
    #[getset(get = "pub")]
    entries: Vec<RatedScore<'a>>,
    #[getset(get_copy = "pub")]
    sum: u32,
}

#[derive(Clone, Debug, Serialize, Getters, CopyGetters)]
pub struct RatingSummary<'a> {
    #[getset(get = "pub")]
    pools: EnumMap<ScoreGeneration, RankedPool<'a>>,
    #[getset(get_copy = "pub")]
    total: u32,
}

impl<'a> RatingSummary<'a> {
    pub fn deluxe(&self) -> &RankedPool<'a> {
        &self.pools[ScoreGeneration::Deluxe]
    }

    pub fn standard(&self) -> &RankedPool<'a> {
        &self.pools[ScoreGeneration::Standard]
    }
}

/// Rates every played score and sums the best ones of each generation.
///
/// Scores without an achievement are skipped.  An unparsable level label
/// fails the whole aggregation.
pub fn aggregate<'a>(
    calculator: &RatingCalculator,
    sizes: PoolSizes,
    scores: &'a [ScoreRecord],
) -> Result<RatingSummary<'a>, ParseError> {
    let mut rated = EnumMap::<ScoreGeneration, Vec<RatedScore<'a>>>::default();
    for record in scores.iter().filter(|x| x.achievement().is_some()) {
        let rating = calculator.compute_rating(record)?;
        rated[record.generation()].push(RatedScore { record, rating });
    }
    let pools = rated.map(|generation, mut entries| {
        // Stable, so equal ratings keep their input order
        entries.sort_by_key(|x| Reverse(x.rating));
        entries.truncate(sizes.get(generation));
        let sum = entries.iter().map(|x| x.rating.get()).sum();
        RankedPool { entries, sum }
    });
    let total = pools.values().map(|x| x.sum).sum();
    Ok(RatingSummary { pools, total })
}
