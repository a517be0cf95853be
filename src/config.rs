use std::path::PathBuf;

use bon::Builder;

use crate::catalog::{ModelCatalog, ModelInfo};

/// Number of material-group pickers shown by default.
pub const DEFAULT_MAX_GROUP_PICKERS: usize = 3;

/// Viewer settings, optionally read from a JSON file.
#[derive(Builder, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct ViewerConfig {
    /// Directory catalog paths are resolved against.
    #[builder(into, default = PathBuf::from("public"))]
    pub asset_root: PathBuf,
    #[builder(default = DEFAULT_MAX_GROUP_PICKERS)]
    pub max_group_pickers: usize,
    #[builder(default = ModelCatalog::builtin())]
    pub models: ModelCatalog,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ViewerConfig {
    /// Read a config file. Missing fields take their defaults.
    #[cfg(feature = "json")]
    pub fn load(path: &std::path::Path) -> crate::error::IResult<Self> {
        let file = std::fs::File::open(path)?;
        let config: ViewerConfig = serde_json::from_reader(std::io::BufReader::new(file))?;
        tracing::debug!(
            "loaded config from {}: {} model(s), asset root {}",
            path.display(),
            config.models.len(),
            config.asset_root.display()
        );
        Ok(config)
    }

    pub fn find_model(&self, id: &str) -> Option<&ModelInfo> {
        self.models.find(id)
    }
}
