use std::path::PathBuf;

use clap::Parser;
use log::info;
use maimai_rating_inspector::{fs_json_util::write_json, maimai::song_score_parser};
use scraper::Html;

#[derive(Parser)]
struct Opts {
    input_file: PathBuf,
    /// Saves the records instead of printing them
    #[arg(long)]
    output_json: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let opts = Opts::parse();

    let html = Html::parse_document(&fs_err::read_to_string(&opts.input_file)?);
    let records = song_score_parser::parse(&html)?;
    match opts.output_json {
        Some(path) => {
            write_json(&path, &records)?;
            info!("Saved {} records to {path:?}.", records.len());
        }
        None => {
            for record in &records {
                println!("{record:?}");
            }
        }
    }
    Ok(())
}
