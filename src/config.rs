use std::path::Path;

use anyhow::{bail, Context};
use getset::{CopyGetters, Getters};
use log::info;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    fs_json_util::read_toml,
    maimai::{
        aggregate::PoolSizes,
        in_lv::DEFAULT_IN_LV_URL,
        rating::{CoefficientTable, RatingCalculator},
        reconcile::{Reconciler, DEFAULT_SIMILARITY_THRESHOLD},
    },
};

/// Tunables of a run.  Every field may be omitted from the file.
#[derive(Clone, Debug, Serialize, Deserialize, Getters, CopyGetters)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    #[getset(get = "pub")]
    coefficient_table: CoefficientTable,
    #[getset(get_copy = "pub")]
    similarity_threshold: f64,
    #[getset(get_copy = "pub")]
    pool_sizes: PoolSizes,
    in_lv_url: Option<Url>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            coefficient_table: CoefficientTable::canonical(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            pool_sizes: PoolSizes::default(),
            in_lv_url: None,
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config: Self = match path {
            Some(path) => {
                info!("Loading configuration from {path:?}");
                read_toml(path)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !(self.similarity_threshold.is_finite() && self.similarity_threshold >= 0.) {
            bail!(
                "Similarity threshold must be a non-negative number: {}",
                self.similarity_threshold
            );
        }
        Ok(())
    }

    pub fn in_lv_url(&self) -> anyhow::Result<Url> {
        match &self.in_lv_url {
            Some(url) => Ok(url.clone()),
            None => Url::parse(DEFAULT_IN_LV_URL).context("Invalid default in_lv url"),
        }
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.similarity_threshold)
    }

    pub fn calculator(&self) -> RatingCalculator {
        RatingCalculator::new(self.coefficient_table.clone())
    }
}
