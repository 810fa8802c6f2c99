//! Guildworks Data -- data-driven game definitions for the guildworks core.
//!
//! Resources, recipes, building types, and world tuning live in RON, TOML,
//! or JSON data files (see `data/base.ron`), get parsed into the [`schema`]
//! types, and resolve by name into a frozen core registry. The embedded
//! base game is what the integration tests and demos run on.
//!
//! ```rust,ignore
//! let world = guildworks_data::base_world().unwrap();
//! ```

pub mod loader;
pub mod resolve;
pub mod schema;

use guildworks_core::registry::Registry;
use guildworks_core::world::{WorldConfig, WorldState};
use loader::{DataLoadError, Format, deserialize_file, deserialize_str, find_data_file,
    require_data_file};
use schema::{ConfigData, GameData};
use std::path::Path;

/// The embedded base game content.
const BASE_GAME_RON: &str = include_str!("../data/base.ron");

/// The embedded base game config.
const BASE_CONFIG_TOML: &str = include_str!("../data/config.toml");

/// Parse the embedded base game definitions.
pub fn base_game() -> Result<GameData, DataLoadError> {
    deserialize_str(BASE_GAME_RON, Format::Ron, Path::new("data/base.ron"))
}

/// Parse the embedded base game config.
pub fn base_config() -> Result<ConfigData, DataLoadError> {
    deserialize_str(BASE_CONFIG_TOML, Format::Toml, Path::new("data/config.toml"))
}

/// Resolve the embedded base game into a registry.
pub fn base_registry() -> Result<Registry, DataLoadError> {
    base_game()?.resolve()
}

/// Build a fresh world over the embedded base game.
pub fn base_world() -> Result<WorldState, DataLoadError> {
    let registry = base_registry()?;
    let config = base_config()?.to_world_config();
    Ok(WorldState::new(registry, config))
}

/// Load a world from a data directory: a required `game` file and an
/// optional `config` file, each in any supported format.
pub fn load_world_from_dir(dir: &Path) -> Result<WorldState, DataLoadError> {
    let game_path = require_data_file(dir, "game")?;
    let game: GameData = deserialize_file(&game_path)?;
    let registry = game.resolve()?;

    let config = match find_data_file(dir, "config")? {
        Some(path) => {
            let data: ConfigData = deserialize_file(&path)?;
            data.to_world_config()
        }
        None => WorldConfig::default(),
    };

    Ok(WorldState::new(registry, config))
}
