use crate::builder::Grid;
use crate::error::Result;
use crate::obj::NameMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Settings for the conversion commands, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub name_mode: NameMode,
    pub divide_grid: bool,
    pub grid: Grid,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            name_mode: NameMode::None,
            divide_grid: true,
            grid: Grid::default(),
        }
    }
}

impl ExportConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn grid(&self) -> Option<&Grid> {
        self.divide_grid.then_some(&self.grid)
    }
}
