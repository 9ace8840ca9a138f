use std::fmt::Display;

use joinery::JoinableIterator;
use lazy_format::lazy_format;
use serde::Serialize;

use super::{
    aggregate::{RankedPool, RatedScore, RatingSummary},
    reconcile::MatchLog,
};

/// Everything a run produces, ready to be printed or saved as JSON.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    total: u32,
    deluxe: &'a RankedPool<'a>,
    standard: &'a RankedPool<'a>,
    match_log: &'a MatchLog,
}

impl<'a> Report<'a> {
    pub fn new(summary: &'a RatingSummary<'a>, match_log: &'a MatchLog) -> Self {
        Self {
            total: summary.total(),
            deluxe: summary.deluxe(),
            standard: summary.standard(),
            match_log,
        }
    }

    pub fn display(&self) -> impl Display + '_ {
        let deluxe = describe_pool("DX", self.deluxe);
        let standard = describe_pool("Standard", self.standard);
        let fuzzy_matches = (self.match_log.fuzzy_matches().iter())
            .map(|x| {
                lazy_format!(
                    "{} ----> {} ({:.3})",
                    x.reference_name(),
                    x.matched_name(),
                    x.similarity()
                )
            })
            .join_with("\n");
        let unmatched = (self.match_log.unmatched().iter())
            .map(|x| {
                lazy_format!(
                    "{} ({} {} {})",
                    x.song_name(),
                    x.generation().abbrev(),
                    x.difficulty().abbrev(),
                    x.level()
                )
            })
            .join_with("\n");
        lazy_format!(
            "Total rating: {}\nDX: {}\nStandard: {}\n\n{deluxe}\n{standard}\n\
            Fuzzy matches\n{fuzzy_matches}\n\nNot matched\n{unmatched}\n",
            self.total,
            self.deluxe.sum(),
            self.standard.sum(),
        )
    }
}

fn describe_pool<'a>(title: &'a str, pool: &'a RankedPool<'a>) -> impl Display + 'a {
    let entries = (pool.entries().iter().enumerate())
        .map(|(i, entry)| describe_rated_score(i + 1, entry))
        .join_with("\n");
    lazy_format!(
        "{title} top {} (sum {})\n{entries}\n",
        pool.entries().len(),
        pool.sum()
    )
}

pub fn describe_rated_score<'a>(rank: usize, entry: &'a RatedScore<'a>) -> impl Display + 'a {
    let record = entry.record();
    let achievement = record
        .achievement()
        .map_or_else(|| "-".to_owned(), |x| x.to_string());
    let internal = record
        .internal_level()
        .map_or_else(|| "-".to_owned(), |x| x.get().to_string());
    lazy_format!(
        "{rank:>2}. {:<5} {:<3} {achievement:>9} {:>3} ({internal}) {}",
        record.difficulty().abbrev(),
        record.level().as_str(),
        entry.rating().get(),
        record.song_name(),
    )
}
