use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use log::info;
use maimai_rating_inspector::{
    api::{fetch_in_lv_js, reqwest_client},
    config::Config,
    fs_json_util::{read_json, write_json},
    maimai::{
        aggregate::aggregate,
        in_lv::parse_in_lv_js,
        report::Report,
        schema::{LevelReference, ScoreRecord},
        song_score_parser,
    },
};
use scraper::Html;

#[derive(Parser)]
struct Opts {
    /// Saved `record/musicGenre/search/?genre=99&diff=N` pages
    #[arg(required_unless_present = "scores_json")]
    score_pages: Vec<PathBuf>,
    /// Scores dumped by `parse_score_page`, read in addition to the pages
    #[arg(long)]
    scores_json: Option<PathBuf>,
    /// Local copy of `maidx_in_lv_data.js`.  Downloaded when omitted.
    #[arg(long)]
    in_lv_js: Option<PathBuf>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    output_json: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let opts = Opts::parse();
    let config = Config::load(opts.config.as_deref())?;

    let (scores, references) = tokio::try_join!(
        load_scores(opts.score_pages, opts.scores_json),
        load_references(&config, opts.in_lv_js.as_deref()),
    )?;
    info!(
        "Loaded {} scores and {} internal levels",
        scores.len(),
        references.len()
    );

    let (scores, match_log) = config
        .reconciler()
        .reconcile(scores, &references)
        .into_parts();
    let summary = aggregate(&config.calculator(), config.pool_sizes(), &scores)?;
    let report = Report::new(&summary, &match_log);
    print!("{}", report.display());

    if let Some(path) = &opts.output_json {
        write_json(path, &report)?;
        info!("Successfully saved the report to {path:?}.");
    }

    Ok(())
}

async fn load_scores(
    pages: Vec<PathBuf>,
    scores_json: Option<PathBuf>,
) -> anyhow::Result<Vec<ScoreRecord>> {
    tokio::task::spawn_blocking(move || {
        let mut scores: Vec<ScoreRecord> = match scores_json {
            Some(path) => read_json(path)?,
            None => vec![],
        };
        for path in pages {
            let html = Html::parse_document(&fs_err::read_to_string(&path)?);
            let parsed = song_score_parser::parse(&html)
                .with_context(|| format!("While parsing {path:?}"))?;
            info!("Found {} charts in {path:?}", parsed.len());
            scores.extend(parsed);
        }
        anyhow::Ok(scores)
    })
    .await?
}

async fn load_references(
    config: &Config,
    in_lv_js: Option<&Path>,
) -> anyhow::Result<Vec<LevelReference>> {
    let js = match in_lv_js {
        Some(path) => fs_err::read_to_string(path)?,
        None => fetch_in_lv_js(&reqwest_client()?, config.in_lv_url()?).await?,
    };
    Ok(parse_in_lv_js(&js)?)
}
