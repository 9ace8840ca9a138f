use std::{fmt::Display, str::FromStr};

use anyhow::bail;
use enum_map::Enum;
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};
use typed_builder::TypedBuilder;

use super::rating::ParseError;

#[derive(
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    derive_more::From,
    derive_more::AsRef,
    derive_more::Display,
    Serialize,
    Deserialize,
)]
#[as_ref(forward)]
pub struct SongName(String);

impl SongName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The level as displayed on the scoreboard, such as `13` or `13+`.
/// Kept verbatim because it takes part in the join keys.
#[derive(
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    derive_more::From,
    derive_more::AsRef,
    derive_more::Display,
    Serialize,
    Deserialize,
)]
#[as_ref(forward)]
pub struct LevelLabel(String);

impl LevelLabel {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize, Enum,
)]
pub enum ScoreGeneration {
    Standard,
    Deluxe,
}
impl ScoreGeneration {
    pub fn abbrev(self) -> &'static str {
        use ScoreGeneration::*;
        match self {
            Standard => "Std",
            Deluxe => "DX",
        }
    }

    pub fn is_deluxe(self) -> bool {
        self == ScoreGeneration::Deluxe
    }
}

#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize, EnumIter,
)]
pub enum ScoreDifficulty {
    Basic,
    Advanced,
    Expert,
    Master,
    ReMaster,
}
impl ScoreDifficulty {
    pub fn abbrev(self) -> &'static str {
        use ScoreDifficulty::*;
        match self {
            Basic => "Bas",
            Advanced => "Adv",
            Expert => "Exp",
            Master => "Mas",
            ReMaster => "ReMas",
        }
    }

    pub fn abbrev_kanji(self) -> char {
        use ScoreDifficulty::*;
        match self {
            Basic => '緑',
            Advanced => '黄',
            Expert => '赤',
            Master => '紫',
            ReMaster => '白',
        }
    }

    /// The name used in the scoreboard's CSS classes, e.g. `music_remaster_score_back`.
    pub fn class_name(self) -> &'static str {
        use ScoreDifficulty::*;
        match self {
            Basic => "basic",
            Advanced => "advanced",
            Expert => "expert",
            Master => "master",
            ReMaster => "remaster",
        }
    }

    pub fn from_class_name(name: &str) -> Option<Self> {
        Self::iter().find(|d| d.class_name() == name)
    }
}

impl FromStr for ScoreDifficulty {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use ScoreDifficulty::*;
        Ok(match s.chars().next() {
            Some('b' | 'B') => Basic,
            Some('a' | 'A') => Advanced,
            Some('e' | 'E') => Expert,
            Some('m' | 'M') => Master,
            Some('r' | 'R') => ReMaster,
            _ => bail!("Invalid score difficulty: {:?}", s),
        })
    }
}

/// Achievement in percent, e.g. `100.5` for `100.5000%`.
#[derive(Clone, Copy, PartialEq, PartialOrd, Debug, Serialize, Deserialize)]
pub struct AchievementPercent(f64);

impl AchievementPercent {
    pub fn get(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for AchievementPercent {
    type Error = f64;
    fn try_from(value: f64) -> Result<Self, f64> {
        if value.is_finite() && value >= 0. {
            Ok(Self(value))
        } else {
            Err(value)
        }
    }
}

impl FromStr for AchievementPercent {
    type Err = ParseError;
    fn from_str(s: &str) -> Result<Self, ParseError> {
        let s = s.trim();
        regex!(r"^([0-9]+(?:\.[0-9]+)?)\s*%?$")
            .captures(s)
            .and_then(|captures| captures[1].parse::<f64>().ok())
            .and_then(|x| Self::try_from(x).ok())
            .ok_or_else(|| ParseError::InvalidAchievement(s.to_owned()))
    }
}

impl Display for AchievementPercent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}%", self.0)
    }
}

#[derive(
    Clone,
    Copy,
    PartialEq,
    PartialOrd,
    Debug,
    derive_more::From,
    derive_more::Into,
    derive_more::Display,
    Serialize,
    Deserialize,
)]
pub struct InternalLevel(f64);

impl InternalLevel {
    pub fn get(self) -> f64 {
        self.0
    }
}

#[derive(
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    derive_more::From,
    derive_more::Into,
    derive_more::Display,
    Serialize,
    Deserialize,
)]
pub struct RatingValue(u32);

impl RatingValue {
    pub fn get(self) -> u32 {
        self.0
    }
}

/// One chart row of the scoreboard.
#[derive(Clone, PartialEq, Debug, TypedBuilder, Getters, CopyGetters, Serialize, Deserialize)]
pub struct ScoreRecord {
    #[getset(get = "pub")]
    song_name: SongName,
    #[getset(get = "pub")]
    level: LevelLabel,
    #[getset(get_copy = "pub")]
    achievement: Option<AchievementPercent>,
    #[getset(get_copy = "pub")]
    difficulty: ScoreDifficulty,
    #[getset(get_copy = "pub")]
    generation: ScoreGeneration,
    #[getset(get_copy = "pub")]
    #[builder(default, setter(skip))]
    #[serde(default)]
    internal_level: Option<InternalLevel>,
}

impl ScoreRecord {
    pub fn exact_key(&self) -> ExactKey<'_> {
        ExactKey {
            song_name: &self.song_name,
            group: self.group_key(),
        }
    }

    pub fn group_key(&self) -> GroupKey<'_> {
        GroupKey {
            level: &self.level,
            difficulty: self.difficulty,
            generation: self.generation,
        }
    }

    /// Only the reconciliation engine writes this, and at most once per record.
    pub(super) fn assign_internal_level(&mut self, level: InternalLevel) {
        debug_assert!(
            self.internal_level.is_none(),
            "Internal level of {:?} is assigned twice",
            self.song_name
        );
        if self.internal_level.is_none() {
            self.internal_level = Some(level);
        }
    }
}

/// One entry of the internal level dataset.
#[derive(Clone, PartialEq, Debug, TypedBuilder, Getters, CopyGetters, Serialize, Deserialize)]
pub struct LevelReference {
    #[getset(get = "pub")]
    song_name: SongName,
    #[getset(get = "pub")]
    level: LevelLabel,
    #[getset(get_copy = "pub")]
    internal_level: InternalLevel,
    #[getset(get_copy = "pub")]
    difficulty: ScoreDifficulty,
    #[getset(get_copy = "pub")]
    generation: ScoreGeneration,
}

impl LevelReference {
    pub fn exact_key(&self) -> ExactKey<'_> {
        ExactKey {
            song_name: &self.song_name,
            group: self.group_key(),
        }
    }

    pub fn group_key(&self) -> GroupKey<'_> {
        GroupKey {
            level: &self.level,
            difficulty: self.difficulty,
            generation: self.generation,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ExactKey<'a> {
    song_name: &'a SongName,
    group: GroupKey<'a>,
}

/// Charts sharing a level label, difficulty and generation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct GroupKey<'a> {
    level: &'a LevelLabel,
    difficulty: ScoreDifficulty,
    generation: ScoreGeneration,
}
