use std::path::PathBuf;

pub const DATA_DIR_VAR: &str = "BRAIN_TUMOR_DATA_DIR";
pub const ARTIFACT_DIR_VAR: &str = "BRAIN_TUMOR_ARTIFACT_DIR";

const DEFAULT_DATA_DIR: &str = "brain_tumor_app";
const DEFAULT_ARTIFACT_DIR: &str = "brain_tumor_model";

/// File-system locations shared by the trainer and the classifier UI.
///
/// Values come from the environment (a `.env` file is honoured) and fall back
/// to paths relative to the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub artifact_dir: PathBuf,
}

impl Settings {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| dotenvy::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let path = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(default))
        };

        Self {
            data_dir: path(DATA_DIR_VAR, DEFAULT_DATA_DIR),
            artifact_dir: path(ARTIFACT_DIR_VAR, DEFAULT_ARTIFACT_DIR),
        }
    }

    pub fn training_dir(&self) -> PathBuf {
        self.data_dir.join("Training")
    }

    pub fn testing_dir(&self) -> PathBuf {
        self.data_dir.join("Testing")
    }
}
