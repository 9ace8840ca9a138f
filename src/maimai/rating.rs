use std::num::ParseIntError;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::schema::{AchievementPercent, LevelLabel, RatingValue, ScoreRecord, SongName};

/// Achievements above this ratio are rewarded as if they were exactly this.
pub const MAX_REWARDED_RATIO: f64 = 1.005;

#[derive(PartialEq, Eq, Debug, Error)]
pub enum ParseError {
    #[error("Level label is not a valid integer (after stripping `+`): {label:?}")]
    InvalidLevelLabel {
        label: String,
        #[source]
        source: ParseIntError,
    },
    #[error("Achievement cannot be parsed as a percentage: {0:?}")]
    InvalidAchievement(String),
    #[error("Achievement is absent for {0:?}")]
    MissingAchievement(SongName),
}

#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct RankThreshold {
    /// Achievement ratio, 1.0 for 100%
    pub percentage: f64,
    pub coefficient: f64,
}

#[derive(PartialEq, Eq, Debug, Error)]
pub enum CoefficientTableError {
    #[error("Coefficient table is empty")]
    Empty,
    #[error("Entry {0} of the coefficient table is not a finite number")]
    NotFinite(usize),
    #[error("Thresholds are not strictly descending at entry {0}")]
    NotDescending(usize),
    #[error("Coefficient increases at entry {0} although its threshold is lower")]
    CoefficientIncreasing(usize),
}

// https://sgimera.github.io/mai_RatingAnalyzer/maidx_rating.html
const CANONICAL_TABLE: [(f64, f64); 13] = [
    (1.0050, 15.0),
    (1.0000, 14.0),
    (0.9999, 13.5),
    (0.9950, 13.0),
    (0.9900, 12.0),
    (0.9800, 11.0),
    (0.9700, 10.0),
    (0.9400, 9.4),
    (0.9000, 9.0),
    (0.8000, 8.0),
    (0.7500, 7.0),
    (0.6000, 6.0),
    (0.5000, 5.0),
];

/// Rank coefficients, strictly descending by threshold and never empty.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(try_from = "Vec<RankThreshold>", into = "Vec<RankThreshold>")]
pub struct CoefficientTable(Vec<RankThreshold>);

impl CoefficientTable {
    pub fn canonical() -> Self {
        Self(
            CANONICAL_TABLE
                .iter()
                .map(|&(percentage, coefficient)| RankThreshold {
                    percentage,
                    coefficient,
                })
                .collect(),
        )
    }

    pub fn entries(&self) -> &[RankThreshold] {
        &self.0
    }

    /// The coefficient of the first entry whose threshold does not exceed `ratio`,
    /// or that of the lowest entry if there is none.
    pub fn coefficient_for(&self, ratio: f64) -> f64 {
        match self
            .0
            .iter()
            .find(|entry| ratio >= entry.percentage)
            .or(self.0.last())
        {
            Some(entry) => entry.coefficient,
            None => unreachable!("The table is guarded to be non-empty"),
        }
    }
}

impl Default for CoefficientTable {
    fn default() -> Self {
        Self::canonical()
    }
}

impl TryFrom<Vec<RankThreshold>> for CoefficientTable {
    type Error = CoefficientTableError;

    fn try_from(entries: Vec<RankThreshold>) -> Result<Self, Self::Error> {
        if entries.is_empty() {
            return Err(CoefficientTableError::Empty);
        }
        for (i, entry) in entries.iter().enumerate() {
            if !(entry.percentage.is_finite() && entry.coefficient.is_finite()) {
                return Err(CoefficientTableError::NotFinite(i));
            }
            if i > 0 && entries[i - 1].percentage <= entry.percentage {
                return Err(CoefficientTableError::NotDescending(i));
            }
            if i > 0 && entries[i - 1].coefficient < entry.coefficient {
                return Err(CoefficientTableError::CoefficientIncreasing(i));
            }
        }
        Ok(Self(entries))
    }
}

impl From<CoefficientTable> for Vec<RankThreshold> {
    fn from(table: CoefficientTable) -> Self {
        table.0
    }
}

/// `N` for `"N"`, `N + 0.5` for `"N+"`.
pub fn parse_level_label(label: &LevelLabel) -> Result<f64, ParseError> {
    let label = label.as_str();
    let stripped = label.strip_suffix('+');
    let level: u32 = stripped
        .unwrap_or(label)
        .parse()
        .map_err(|source| ParseError::InvalidLevelLabel {
            label: label.to_owned(),
            source,
        })?;
    Ok(level as f64 + if stripped.is_some() { 0.5 } else { 0. })
}

/// The internal level if reconciliation found one, otherwise the level derived from the label.
pub fn resolve_level(record: &ScoreRecord) -> Result<f64, ParseError> {
    match record.internal_level() {
        Some(level) => Ok(level.get()),
        None => parse_level_label(record.level()),
    }
}

#[derive(Clone, Debug, Default)]
pub struct RatingCalculator {
    table: CoefficientTable,
}

impl RatingCalculator {
    pub fn new(table: CoefficientTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &CoefficientTable {
        &self.table
    }

    pub fn coefficient_for(&self, ratio: f64) -> f64 {
        self.table.coefficient_for(ratio)
    }

    pub fn single_song_rating(&self, level: f64, achievement: AchievementPercent) -> RatingValue {
        let ratio = (achievement.get() / 100.).min(MAX_REWARDED_RATIO);
        let rating = (level * ratio * self.coefficient_for(ratio)).floor();
        // Negative products only arise from negative levels; they are rated 0.
        RatingValue::from(rating.max(0.) as u32)
    }

    pub fn compute_rating(&self, record: &ScoreRecord) -> Result<RatingValue, ParseError> {
        let achievement = record
            .achievement()
            .ok_or_else(|| ParseError::MissingAchievement(record.song_name().clone()))?;
        Ok(self.single_song_rating(resolve_level(record)?, achievement))
    }
}
