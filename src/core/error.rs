use thiserror::Error;

use crate::app::AppError;
use crate::core::config::ConfigError;
use crate::items::descriptor::DescriptorLoadError;
use crate::items::factory::FactoryError;
use crate::items::placement::PlacementError;
use crate::tower::TowerError;

#[derive(Error, Debug)]
pub enum SkyscraperError {
    #[error("Factory error: {0}")]
    Factory(#[from] FactoryError),

    #[error("Placement error: {0}")]
    Placement(#[from] PlacementError),

    #[error("Tower error: {0}")]
    Tower(#[from] TowerError),

    #[error("Application error: {0}")]
    App(#[from] AppError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Descriptor table error: {0}")]
    Descriptors(#[from] DescriptorLoadError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SkyscraperError>;
