use std::path::Path;

use anyhow::{bail, Context, Result};
use oosrando_game::ProgressExemptions;
use serde_derive::{Deserialize, Serialize};

// Restart a try if routing runs for too long, and give up if it fails too
// many times.
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;
pub const DEFAULT_MAX_TRIES: usize = 10;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RandomizerSettings {
    pub start: Vec<String>,
    pub goal: Vec<String>,
    #[serde(default)]
    pub forbid: Vec<String>,
    // Maximum number of placements along one search path. Defaults to the
    // number of open slots.
    #[serde(default)]
    pub max_len: Option<usize>,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_max_tries")]
    pub max_tries: usize,
    #[serde(default)]
    pub progress_exemptions: ProgressExemptions,
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

fn default_max_tries() -> usize {
    DEFAULT_MAX_TRIES
}

impl RandomizerSettings {
    pub fn new(start: &[&str], goal: &[&str], forbid: &[&str]) -> Self {
        let to_vec = |xs: &[&str]| -> Vec<String> { xs.iter().map(|x| x.to_string()).collect() };
        RandomizerSettings {
            start: to_vec(start),
            goal: to_vec(goal),
            forbid: to_vec(forbid),
            max_len: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_tries: DEFAULT_MAX_TRIES,
            progress_exemptions: ProgressExemptions::default(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let settings_str = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read {}", path.display()))?;
        let settings: RandomizerSettings = serde_json::from_str(&settings_str)
            .with_context(|| format!("unable to parse {}", path.display()))?;
        settings.check()?;
        Ok(settings)
    }

    pub fn check(&self) -> Result<()> {
        if self.goal.is_empty() {
            bail!("no goal nodes given");
        }
        if self.max_tries == 0 {
            bail!("max_tries must be positive");
        }
        if self.max_iterations == 0 {
            bail!("max_iterations must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let json = r#"{"start": ["start"], "goal": ["done"]}"#;
        let settings: RandomizerSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings, RandomizerSettings::new(&["start"], &["done"], &[]));
        assert_eq!(settings.max_iterations, 1000);
        assert_eq!(settings.max_tries, 10);
        assert_eq!(settings.progress_exemptions.harvest_node, "harvest item");
        assert!(settings.check().is_ok());
    }

    #[test]
    fn test_settings_check() {
        let mut settings = RandomizerSettings::new(&["start"], &[], &[]);
        assert!(settings.check().is_err());
        settings.goal = vec!["done".to_string()];
        settings.max_tries = 0;
        assert!(settings.check().is_err());
    }
}
