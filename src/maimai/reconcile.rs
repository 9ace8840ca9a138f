//! Joins scores with internal levels, exactly first and then by name similarity.

use std::cmp::Reverse;

use getset::{CopyGetters, Getters};
use hashbrown::HashMap;
use log::{debug, info, warn};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use super::{
    schema::{GroupKey, InternalLevel, LevelReference, ScoreRecord, SongName},
    similarity::combined_similarity,
};

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.1;

#[derive(Clone, Debug, Serialize, Deserialize, Getters, CopyGetters)]
pub struct FuzzyMatch {
    #[getset(get = "pub")]
    reference_name: SongName,
    #[getset(get = "pub")]
    matched_name: SongName,
    #[getset(get_copy = "pub")]
    similarity: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, Getters)]
#[getset(get = "pub")]
pub struct MatchLog {
    fuzzy_matches: Vec<FuzzyMatch>,
    unmatched: Vec<LevelReference>,
}

/// Scores after reconciliation.  They can no longer be modified.
#[derive(Debug, Serialize, Getters)]
#[getset(get = "pub")]
pub struct Reconciliation {
    scores: Vec<ScoreRecord>,
    log: MatchLog,
}

impl Reconciliation {
    pub fn into_parts(self) -> (Vec<ScoreRecord>, MatchLog) {
        (self.scores, self.log)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Reconciler {
    similarity_threshold: f64,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl Reconciler {
    pub fn new(similarity_threshold: f64) -> Self {
        Self {
            similarity_threshold,
        }
    }

    pub fn reconcile(
        &self,
        mut scores: Vec<ScoreRecord>,
        references: &[LevelReference],
    ) -> Reconciliation {
        let (assigned, log) = self.assign(&scores, references);
        for (score, level) in scores.iter_mut().zip(assigned) {
            if let Some(level) = level {
                score.assign_internal_level(level);
            }
        }
        Reconciliation { scores, log }
    }

    /// Decides the internal level of each score without touching the scores themselves.
    fn assign(
        &self,
        scores: &[ScoreRecord],
        references: &[LevelReference],
    ) -> (Vec<Option<InternalLevel>>, MatchLog) {
        // Scores that already carry an internal level are never reassigned
        let mut assigned = scores.iter().map(|x| x.internal_level()).collect::<Vec<_>>();
        let fresh = assigned.iter().map(Option::is_none).collect::<Vec<_>>();

        // Later duplicates overwrite earlier ones
        let exact_index: HashMap<_, _> = scores
            .iter()
            .enumerate()
            .map(|(i, score)| (score.exact_key(), i))
            .collect();
        let mut group_index = HashMap::<GroupKey, Vec<usize>>::new();
        for (i, score) in scores.iter().enumerate() {
            group_index.entry(score.group_key()).or_default().push(i);
        }

        let mut deferred = vec![];
        for reference in references {
            match exact_index.get(&reference.exact_key()) {
                Some(&i) if assigned[i].is_none() => {
                    assigned[i] = Some(reference.internal_level());
                }
                _ => deferred.push(reference),
            }
        }
        debug!(
            "{} of {} references matched exactly",
            references.len() - deferred.len(),
            references.len()
        );

        let mut log = MatchLog::default();
        for reference in deferred {
            let best = group_index
                .get(&reference.group_key())
                .into_iter()
                .flatten()
                .copied()
                .filter(|&i| assigned[i].is_none())
                .map(|i| {
                    let similarity = combined_similarity(
                        scores[i].song_name().as_str(),
                        reference.song_name().as_str(),
                    );
                    (i, similarity)
                })
                .filter(|&(_, similarity)| similarity >= self.similarity_threshold)
                // `min_by_key` keeps the first of equal elements, so the earliest score wins ties
                .min_by_key(|&(_, similarity)| Reverse(OrderedFloat(similarity)));
            match best {
                Some((i, similarity)) => {
                    info!(
                        "{} ----> {} ({similarity:.3})",
                        reference.song_name(),
                        scores[i].song_name()
                    );
                    assigned[i] = Some(reference.internal_level());
                    log.fuzzy_matches.push(FuzzyMatch {
                        reference_name: reference.song_name().clone(),
                        matched_name: scores[i].song_name().clone(),
                        similarity,
                    });
                }
                None => {
                    warn!(
                        "No score matches {} ({} {:?} {:?})",
                        reference.song_name(),
                        reference.level(),
                        reference.difficulty(),
                        reference.generation(),
                    );
                    log.unmatched.push(reference.clone());
                }
            }
        }

        // Only report what this run assigned
        for (level, fresh) in assigned.iter_mut().zip(fresh) {
            if !fresh {
                *level = None;
            }
        }
        (assigned, log)
    }
}

#[cfg(test)]
mod tests {
    use super::Reconciler;
    use crate::maimai::schema::{
        InternalLevel, LevelReference, ScoreDifficulty, ScoreGeneration, ScoreRecord,
    };

    fn score(name: &str, level: &str, difficulty: ScoreDifficulty, dx: bool) -> ScoreRecord {
        ScoreRecord::builder()
            .song_name(name.to_owned().into())
            .level(level.to_owned().into())
            .achievement(Some("100.0000%".parse().unwrap()))
            .difficulty(difficulty)
            .generation(if dx {
                ScoreGeneration::Deluxe
            } else {
                ScoreGeneration::Standard
            })
            .build()
    }

    fn reference(
        name: &str,
        level: &str,
        internal: f64,
        difficulty: ScoreDifficulty,
        dx: bool,
    ) -> LevelReference {
        LevelReference::builder()
            .song_name(name.to_owned().into())
            .level(level.to_owned().into())
            .internal_level(InternalLevel::from(internal))
            .difficulty(difficulty)
            .generation(if dx {
                ScoreGeneration::Deluxe
            } else {
                ScoreGeneration::Standard
            })
            .build()
    }

    fn internal_levels(scores: &[ScoreRecord]) -> Vec<Option<f64>> {
        scores
            .iter()
            .map(|x| x.internal_level().map(InternalLevel::get))
            .collect()
    }

    use ScoreDifficulty::*;

    #[test]
    fn test_exact_match() {
        let scores = vec![score("Song A", "13", Master, true)];
        let references = [reference("Song A", "13", 13.4, Master, true)];
        let result = Reconciler::default().reconcile(scores, &references);
        assert_eq!(internal_levels(result.scores()), [Some(13.4)]);
        assert!(result.log().fuzzy_matches().is_empty());
        assert!(result.log().unmatched().is_empty());
    }

    #[test]
    fn test_fuzzy_fallback() {
        let scores = vec![score("Song A", "13", Master, true)];
        let references = [
            reference("Song A (Remix)", "13", 13.2, Master, true),
            reference("Song B (Remix)", "13", 13.5, Master, true),
        ];
        let result = Reconciler::default().reconcile(scores, &references);
        assert_eq!(internal_levels(result.scores()), [Some(13.2)]);

        let fuzzy = result.log().fuzzy_matches();
        assert_eq!(fuzzy.len(), 1);
        assert_eq!(fuzzy[0].reference_name().as_str(), "Song A (Remix)");
        assert_eq!(fuzzy[0].matched_name().as_str(), "Song A");
        assert!(fuzzy[0].similarity() > 0.1);

        let unmatched = result.log().unmatched();
        assert_eq!(unmatched.len(), 1);
        assert_eq!(unmatched[0].song_name().as_str(), "Song B (Remix)");
    }

    #[test]
    fn test_exact_pass_runs_before_fuzzy_pass() {
        // The first reference would fuzzily claim "Song A" if the passes were interleaved
        let scores = vec![
            score("Song A", "12", Expert, false),
            score("Song A2", "12", Expert, false),
        ];
        let references = [
            reference("Song A?", "12", 12.3, Expert, false),
            reference("Song A", "12", 12.0, Expert, false),
        ];
        let result = Reconciler::default().reconcile(scores, &references);
        assert_eq!(internal_levels(result.scores()), [Some(12.0), Some(12.3)]);
        assert_eq!(result.log().fuzzy_matches().len(), 1);
    }

    #[test]
    fn test_buckets_are_separated() {
        let scores = vec![
            score("Song A", "13", Master, false),
            score("Song A", "13+", Master, true),
            score("Song A", "11", Expert, true),
        ];
        let references = [
            reference("Song A", "13", 13.1, Master, true),
            reference("Song A", "13+", 13.7, Master, false),
        ];
        let result = Reconciler::default().reconcile(scores, &references);
        assert_eq!(internal_levels(result.scores()), [None, None, None]);
        assert_eq!(result.log().unmatched().len(), 2);
    }

    #[test]
    fn test_tie_goes_to_earliest_score() {
        let scores = vec![
            score("Alpha", "10", Basic, true),
            score("Beta", "10", Basic, true),
            score("Alpha", "10", Basic, true),
        ];
        // "Alpha!" is equally similar to both "Alpha" scores and goes to the first one
        let references = [
            reference("Alpha!", "10", 10.4, Basic, true),
            reference("Alphb", "10", 10.2, Basic, true),
        ];
        let result = Reconciler::default().reconcile(scores, &references);
        assert_eq!(
            internal_levels(result.scores()),
            [Some(10.4), None, Some(10.2)]
        );
    }

    #[test]
    fn test_duplicate_exact_keys() {
        // The later duplicate owns the exact key; the earlier one can still match fuzzily
        let scores = vec![
            score("Dup", "9", Advanced, false),
            score("Dup", "9", Advanced, false),
        ];
        let references = [
            reference("Dup", "9", 9.1, Advanced, false),
            reference("Dup", "9", 9.2, Advanced, false),
        ];
        let result = Reconciler::default().reconcile(scores, &references);
        assert_eq!(internal_levels(result.scores()), [Some(9.2), Some(9.1)]);
        assert_eq!(result.log().fuzzy_matches().len(), 1);
    }

    #[test]
    fn test_preassigned_score_is_kept() {
        // As read back from a JSON dump of a previous run
        let preassigned: ScoreRecord = serde_json::from_str(
            r#"{
                "song_name": "Song A",
                "level": "13",
                "achievement": 100.0,
                "difficulty": "Master",
                "generation": "Deluxe",
                "internal_level": 13.4
            }"#,
        )
        .unwrap();
        let scores = vec![preassigned, score("Song A2", "13", Master, true)];
        let references = [reference("Song A", "13", 13.0, Master, true)];
        let result = Reconciler::default().reconcile(scores, &references);
        assert_eq!(internal_levels(result.scores()), [Some(13.4), Some(13.0)]);

        let fuzzy = result.log().fuzzy_matches();
        assert_eq!(fuzzy.len(), 1);
        assert_eq!(fuzzy[0].matched_name().as_str(), "Song A2");
        // 0.3 * 12/15 + 12/17
        assert!((fuzzy[0].similarity() - (0.24 + 12. / 17.)).abs() < 1e-9);
    }

    #[test]
    fn test_threshold() {
        let scores = vec![score("xyz", "8", Advanced, true)];
        let references = [reference("abc", "8", 8.5, Advanced, true)];
        let result = Reconciler::default().reconcile(scores.clone(), &references);
        assert_eq!(internal_levels(result.scores()), [None]);
        assert_eq!(result.log().unmatched().len(), 1);

        // Any candidate passes a zero threshold
        let result = Reconciler::new(0.).reconcile(scores, &references);
        assert_eq!(internal_levels(result.scores()), [Some(8.5)]);
    }
}
