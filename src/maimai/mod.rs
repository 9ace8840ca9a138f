pub mod aggregate;
pub mod in_lv;
pub mod rating;
pub mod reconcile;
pub mod report;
pub mod schema;
pub mod similarity;
pub mod song_score_parser;
