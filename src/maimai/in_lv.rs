//! Parser for `maidx_in_lv_data.js` of mai_RatingAnalyzer.

use indexmap::IndexMap;
use log::{debug, info};
use serde_json::Value;
use thiserror::Error;

use super::schema::{InternalLevel, LevelReference, ScoreDifficulty, ScoreGeneration};

pub const DEFAULT_IN_LV_URL: &str =
    "https://sgimera.github.io/mai_RatingAnalyzer/scripts_maimai/maidx_in_lv_data.js";

const NAMES_SUFFIX: &str = "_rslt";
const DX_TAG: &str = "[dx]";

#[derive(PartialEq, Eq, Debug, Error)]
pub enum DataIntegrityError {
    #[error("{names_key} has {names_len} elements but {values_key} has {values_len}")]
    LengthMismatch {
        names_key: String,
        values_key: String,
        names_len: usize,
        values_len: usize,
    },
    #[error("{names_key} is present but {values_key} is not")]
    MissingValues {
        names_key: String,
        values_key: String,
    },
    #[error("{0} is not an array")]
    NotAnArray(String),
    #[error("Element {index} of {key} is not an internal level: {value}")]
    InvalidValue {
        key: String,
        index: usize,
        value: String,
    },
    #[error("Element {index} of {key} is not a string")]
    InvalidName { key: String, index: usize },
}

/// Collects the top-level `var` declarations in their order of appearance.
/// Later declarations of the same name overwrite earlier ones.
pub fn parse_declarations(js: &str) -> IndexMap<String, Value> {
    let js = js.trim_start();
    let js = js.strip_prefix("javascript:").unwrap_or(js);
    let mut declarations = IndexMap::new();
    for statement in js.split(';') {
        let statement = statement.replace(['\n', '\r'], "");
        let Some(declaration) = statement.trim().strip_prefix("var ") else {
            continue;
        };
        let Some((key, value)) = declaration.split_once('=') else {
            debug!("Skipping a declaration without a value: {declaration:?}");
            continue;
        };
        match serde_json::from_str(value) {
            Ok(value) => {
                declarations.insert(key.trim().to_owned(), value);
            }
            Err(e) => debug!("Skipping {:?}: {e}", key.trim()),
        }
    }
    declarations
}

/// A song name of the dataset with its annotations removed.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AnnotatedName {
    pub name: String,
    pub difficulty: ScoreDifficulty,
    pub generation: ScoreGeneration,
}

/// Reads `[dx]` and a difficulty tag such as `(白)` out of a name.
/// Untagged names are Master charts of the Standard generation.
pub fn parse_annotated_name(name: &str) -> AnnotatedName {
    use ScoreDifficulty::*;

    let mut name = name.trim().to_owned();
    let mut generation = ScoreGeneration::Standard;
    if name.contains(DX_TAG) {
        name = name.replacen(DX_TAG, "", 1).trim().to_owned();
        generation = ScoreGeneration::Deluxe;
    }
    let mut difficulty = Master;
    // When several tags are present, the last one in this order wins
    for candidate in [ReMaster, Expert, Advanced, Basic] {
        let tag = format!("({})", candidate.abbrev_kanji());
        if name.contains(&tag) {
            name = name.replacen(&tag, "", 1).trim().to_owned();
            difficulty = candidate;
        }
    }
    AnnotatedName {
        name,
        difficulty,
        generation,
    }
}

/// `lv14p_rslt` -> (`lv14plus`, `14+`); `lv13m_rslt` -> (`lv13minus`, `13`).
fn partner_key_and_label(names_key: &str) -> (String, String) {
    let values_key = names_key
        .replacen(NAMES_SUFFIX, "", 1)
        .replacen('m', "minus", 1)
        .replacen('p', "plus", 1);
    let label = values_key
        .replacen("plus", "+", 1)
        .replacen("minus", "", 1)
        .replacen("lv", "", 1);
    (values_key, label)
}

fn as_array<'a>(key: &str, value: &'a Value) -> Result<&'a Vec<Value>, DataIntegrityError> {
    value
        .as_array()
        .ok_or_else(|| DataIntegrityError::NotAnArray(key.to_owned()))
}

fn parse_internal_level(key: &str, index: usize, value: &Value) -> Result<f64, DataIntegrityError> {
    let parsed = match value {
        Value::Number(x) => x.as_f64(),
        Value::String(x) if x.trim().is_empty() => Some(0.),
        Value::String(x) => x.trim().parse().ok(),
        _ => None,
    };
    parsed
        .filter(|x: &f64| x.is_finite())
        .ok_or_else(|| DataIntegrityError::InvalidValue {
            key: key.to_owned(),
            index,
            value: value.to_string(),
        })
}

pub fn extract_references(
    declarations: &IndexMap<String, Value>,
) -> Result<Vec<LevelReference>, DataIntegrityError> {
    let mut references = vec![];
    for (names_key, names) in declarations {
        if !names_key.ends_with(NAMES_SUFFIX) {
            continue;
        }
        let (values_key, label) = partner_key_and_label(names_key);
        let values = declarations
            .get(&values_key)
            .ok_or_else(|| DataIntegrityError::MissingValues {
                names_key: names_key.clone(),
                values_key: values_key.clone(),
            })?;
        let names = as_array(names_key, names)?;
        let values = as_array(&values_key, values)?;
        if names.len() != values.len() {
            return Err(DataIntegrityError::LengthMismatch {
                names_key: names_key.clone(),
                values_key,
                names_len: names.len(),
                values_len: values.len(),
            });
        }

        for (index, (names, value)) in names.iter().zip(values).enumerate() {
            let names = names
                .as_str()
                .ok_or_else(|| DataIntegrityError::InvalidName {
                    key: names_key.clone(),
                    index,
                })?;
            let internal_level = parse_internal_level(&values_key, index, value)?;
            if internal_level <= 0. {
                debug!("Internal level of {names:?} is not confirmed yet ({internal_level})");
                continue;
            }
            for name in names.split('、') {
                let AnnotatedName {
                    name,
                    difficulty,
                    generation,
                } = parse_annotated_name(name);
                if name.is_empty() {
                    continue;
                }
                references.push(
                    LevelReference::builder()
                        .song_name(name.into())
                        .level(label.clone().into())
                        .internal_level(InternalLevel::from(internal_level))
                        .difficulty(difficulty)
                        .generation(generation)
                        .build(),
                );
            }
        }
    }
    info!("Loaded {} internal levels", references.len());
    Ok(references)
}

pub fn parse_in_lv_js(js: &str) -> Result<Vec<LevelReference>, DataIntegrityError> {
    extract_references(&parse_declarations(js))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        parse_annotated_name, parse_declarations, parse_in_lv_js, partner_key_and_label,
        AnnotatedName, DataIntegrityError,
    };
    use crate::maimai::schema::{ScoreDifficulty, ScoreGeneration};

    const SAMPLE: &str = r#"javascript:
var update_mode = "2024/05/01";
var lv15_rslt = ["系ぎて[dx]"];
var lv15 = [15.0];
var lv14p_rslt = [
  "PANDORA PARADOXXX(白)、QZKago Requiem[dx]",
  "Xevel"
];
var lv14plus = ["14.7", 14.6];
var lv13m_rslt = ["Song A[dx](赤)", "Song B", "、"];
var lv13minus = [13.2, -13.0, 13.0];
var broken = [1, 2,;
"#;

    #[test]
    fn test_parse_declarations() {
        let declarations = parse_declarations(SAMPLE);
        assert_eq!(
            declarations.keys().collect::<Vec<_>>(),
            [
                "update_mode",
                "lv15_rslt",
                "lv15",
                "lv14p_rslt",
                "lv14plus",
                "lv13m_rslt",
                "lv13minus"
            ]
        );
        assert_eq!(declarations["lv14plus"], json!(["14.7", 14.6]));
    }

    #[test]
    fn test_partner_key_and_label() {
        for (key, values_key, label) in [
            ("lv15_rslt", "lv15", "15"),
            ("lv14p_rslt", "lv14plus", "14+"),
            ("lv13m_rslt", "lv13minus", "13"),
        ] {
            assert_eq!(
                partner_key_and_label(key),
                (values_key.to_owned(), label.to_owned())
            );
        }
    }

    #[test]
    fn test_parse_annotated_name() {
        use ScoreDifficulty::*;
        use ScoreGeneration::*;
        let parsed = |name: &str, difficulty, generation| AnnotatedName {
            name: name.to_owned(),
            difficulty,
            generation,
        };
        assert_eq!(parse_annotated_name(" Song "), parsed("Song", Master, Standard));
        assert_eq!(
            parse_annotated_name("Song [dx]"),
            parsed("Song", Master, Deluxe)
        );
        assert_eq!(
            parse_annotated_name("Song(黄)[dx]"),
            parsed("Song", Advanced, Deluxe)
        );
        assert_eq!(parse_annotated_name("Song(緑)"), parsed("Song", Basic, Standard));
        // The last tag in the order 白, 赤, 黄, 緑 wins
        assert_eq!(
            parse_annotated_name("Song(赤)(白)"),
            parsed("Song", Expert, Standard)
        );
        assert_eq!(parse_annotated_name("[dx]"), parsed("", Master, Deluxe));
    }

    #[test]
    fn test_parse_in_lv_js() {
        let references = parse_in_lv_js(SAMPLE).unwrap();
        let summary = references
            .iter()
            .map(|x| {
                (
                    x.song_name().as_str(),
                    x.level().as_str(),
                    x.internal_level().get(),
                    x.difficulty(),
                    x.generation(),
                )
            })
            .collect::<Vec<_>>();
        use ScoreDifficulty::*;
        use ScoreGeneration::*;
        assert_eq!(
            summary,
            [
                ("系ぎて", "15", 15.0, Master, Deluxe),
                ("PANDORA PARADOXXX", "14+", 14.7, ReMaster, Standard),
                ("QZKago Requiem", "14+", 14.7, Master, Deluxe),
                ("Xevel", "14+", 14.6, Master, Standard),
                // "Song B" is unconfirmed and the last entry has no names
                ("Song A", "13", 13.2, Expert, Deluxe),
            ]
        );
    }

    #[test]
    fn test_integrity_errors() {
        assert_eq!(
            parse_in_lv_js("var lv12_rslt = [\"a\", \"b\"]; var lv12 = [12.0];"),
            Err(DataIntegrityError::LengthMismatch {
                names_key: "lv12_rslt".to_owned(),
                values_key: "lv12".to_owned(),
                names_len: 2,
                values_len: 1,
            })
        );
        assert_eq!(
            parse_in_lv_js("var lv12p_rslt = [\"a\"];"),
            Err(DataIntegrityError::MissingValues {
                names_key: "lv12p_rslt".to_owned(),
                values_key: "lv12plus".to_owned(),
            })
        );
        assert!(matches!(
            parse_in_lv_js("var lv12_rslt = [\"a\"]; var lv12 = [\"twelve\"];"),
            Err(DataIntegrityError::InvalidValue { index: 0, .. })
        ));
        assert_eq!(
            parse_in_lv_js("var lv12_rslt = \"a\"; var lv12 = [12.0];"),
            Err(DataIntegrityError::NotAnArray("lv12_rslt".to_owned()))
        );
        assert_eq!(parse_in_lv_js("var lv12_rslt = []; var lv12 = [];"), Ok(vec![]));
    }
}
