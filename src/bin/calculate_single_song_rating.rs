use std::{fmt::Display, path::PathBuf};

use anyhow::anyhow;
use clap::Parser;
use inquire::{CustomType, InquireError};
use lazy_format::lazy_format;
use maimai_rating_inspector::{
    config::Config,
    maimai::{
        rating::{RatingCalculator, MAX_REWARDED_RATIO},
        schema::AchievementPercent,
    },
};

#[derive(Parser)]
struct Opts {
    #[arg(long)]
    config: Option<PathBuf>,
}

macro_rules! check {
    ($e: expr) => {{
        let e = $e;
        if let Err(InquireError::OperationInterrupted | InquireError::OperationCanceled) = e {
            return Ok(());
        }
        e
    }};
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let opts = Opts::parse();
    let calculator = Config::load(opts.config.as_deref())?.calculator();

    loop {
        let level: f64 = check!(CustomType::new("Internal Lv.").prompt())?;
        let achievement: f64 = check!(CustomType::new("Achievement (%)").prompt())?;
        let achievement = AchievementPercent::try_from(achievement)
            .map_err(|v| anyhow!("Invalid achievement: {v}"))?;
        println!("{}", show_rating(&calculator, level, achievement));
    }
}

fn show_rating(
    calculator: &RatingCalculator,
    level: f64,
    achievement: AchievementPercent,
) -> impl Display {
    let ratio = (achievement.get() / 100.).min(MAX_REWARDED_RATIO);
    let coefficient = calculator.coefficient_for(ratio);
    let rating = calculator.single_song_rating(level, achievement);
    lazy_format!("{level} x {achievement} x {coefficient} => {rating}")
}
