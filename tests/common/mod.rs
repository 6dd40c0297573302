//! Shared test utilities and fixture generators

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use spamflow::pipeline::{ArtifactLayout, Params};
use tempfile::TempDir;

/// Relative path of the fixture dataset inside a project root
pub const SOURCE: &str = "data/spam.csv";

/// Ten labeled messages: 6 ham, 4 spam, every cleaned text distinct.
///
/// Layout mirrors the public SMS spam corpus: label in `v1`, text in `v2`,
/// plus trailing columns that ingestion must drop.
pub const SPAM_CSV: &str = "\
v1,v2,Unnamed: 2,Unnamed: 3,Unnamed: 4
ham,\"Go until jurong point, crazy.. Available only in bugis n great world la e buffet\",,,
ham,Ok lar... Joking wif u oni...,,,
spam,\"Free entry in 2 a wkly comp to win FA Cup final tkts 21st May 2005. Text FA to 87121\",,,
ham,U dun say so early hor... U c already then say...,,,
ham,\"Nah I don't think he goes to usf, he lives around here though\",,,
spam,FreeMsg Hey there darling it's been 3 week's now and no word back! I'd like some fun,,,
ham,Even my brother is not like to speak with me. They treat me like aids patent.,,,
ham,As per your request 'Melle Melle' has been set as your callertune for all Callers,,,
spam,WINNER!! As a valued network customer you have been selected to receivea prize reward!,,,
spam,Had your mobile 11 months or more? U R entitled to Update to the latest colour mobiles with camera for Free!,,,
";

pub const HAM_COUNT: usize = 6;
pub const SPAM_COUNT: usize = 4;

/// Parameters of the end-to-end scenario
pub fn params_yaml(source: &str) -> String {
    format!(
        "\
data_ingestion:
  source: {source}
  test_size: 0.2
  random_state: 42
feature_engineering:
  max_features: 50
model_building:
  n_estimators: 10
  random_state: 2
"
    )
}

/// A temporary project root with the fixture dataset and params.yaml
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self::with_dataset(SPAM_CSV.as_bytes())
    }

    pub fn with_dataset(bytes: &[u8]) -> Self {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join(SOURCE);
        std::fs::create_dir_all(source.parent().unwrap()).unwrap();
        std::fs::write(&source, bytes).unwrap();
        std::fs::write(dir.path().join("params.yaml"), params_yaml(SOURCE)).unwrap();
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn layout(&self) -> ArtifactLayout {
        ArtifactLayout::new(self.dir.path())
    }

    pub fn params_path(&self) -> PathBuf {
        self.dir.path().join("params.yaml")
    }

    pub fn params(&self) -> Params {
        Params::from_path(&self.params_path()).unwrap()
    }

    /// Replace params.yaml
    pub fn write_params(&self, yaml: &str) {
        std::fs::write(self.params_path(), yaml).unwrap();
    }
}

/// Read an artifact as text
pub fn read_text(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}
