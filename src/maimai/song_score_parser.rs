use anyhow::{bail, Context};
use itertools::Itertools;
use scraper::{ElementRef, Html};

use super::schema::{AchievementPercent, ScoreDifficulty, ScoreGeneration, ScoreRecord};

/// Parses a saved `record/musicGenre/search/` page.
/// Every chart block becomes one record, whether it has been played or not.
pub fn parse(html: &Html) -> anyhow::Result<Vec<ScoreRecord>> {
    html.select(selector!(
        ".music_basic_score_back,.music_advanced_score_back,.music_expert_score_back,.music_master_score_back,.music_remaster_score_back"
    ))
    .map(|block| {
        parse_score_block(block).with_context(|| {
            format!(
                "While parsing {:?}",
                block.text().map(str::trim).filter(|x| !x.is_empty()).join(" ")
            )
        })
    })
    .collect()
}

fn parse_score_block(block: ElementRef) -> anyhow::Result<ScoreRecord> {
    let difficulty = parse_difficulty(block)?;
    let level = find_text(block, selector!(".music_lv_block"))
        .context("Level not found")?
        .to_owned();
    let song_name = find_text(block, selector!(".music_name_block"))
        .context("Song name not found")?
        .to_owned();
    let achievement = find_text(block, selector!(".music_score_block"))
        .map(|x| {
            x.parse::<AchievementPercent>()
                .with_context(|| format!("Invalid achievement for {song_name:?}"))
        })
        .transpose()?;
    let generation = parse_generation(block)?;
    Ok(ScoreRecord::builder()
        .song_name(song_name.into())
        .level(level.into())
        .achievement(achievement)
        .difficulty(difficulty)
        .generation(generation)
        .build())
}

fn find_text(block: ElementRef, selector: &scraper::Selector) -> Option<String> {
    Some(
        block
            .select(selector)
            .next()?
            .text()
            .collect::<String>()
            .trim()
            .to_owned(),
    )
}

fn parse_difficulty(block: ElementRef) -> anyhow::Result<ScoreDifficulty> {
    block
        .value()
        .classes()
        .find_map(|class| {
            let name = class.strip_prefix("music_")?.strip_suffix("_score_back")?;
            ScoreDifficulty::from_class_name(name)
        })
        .context("Difficulty class not found")
}

fn parse_generation(block: ElementRef) -> anyhow::Result<ScoreGeneration> {
    let parent = block
        .parent()
        .and_then(ElementRef::wrap)
        .context("No parent of score block")?;
    let is_deluxe = if let Some(icon) = parent.select(selector!(".music_kind_icon")).next() {
        icon.value()
            .attr("src")
            .context("No src attribute for music kind icon")?
            .contains("music_dx")
    } else if let Some(toggle) = parent.select(selector!(".music_kind_icon_dx")).next() {
        toggle.value().classes().any(|class| class == "btn_on")
    } else {
        bail!("Music kind icon not found")
    };
    Ok(if is_deluxe {
        ScoreGeneration::Deluxe
    } else {
        ScoreGeneration::Standard
    })
}
