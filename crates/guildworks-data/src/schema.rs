//! Serde data file structs for game content definitions.
//!
//! These structs define the on-disk format for resources, recipes, building
//! types, and world configuration. They are deserialized from RON, JSON, or
//! TOML data files and then resolved into core registry types. All
//! quantities are plain f64 in the files; conversion to fixed-point happens
//! once, at resolve time.

use serde::Deserialize;

/// A resource kind definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceData {
    pub name: String,
    /// Market equilibrium constant.
    pub equilibrium: f64,
    pub initial_local_supply: f64,
    pub initial_global_supply: f64,
    /// Names of the resources a composite batch of this kind can yield.
    /// Empty for plain resources.
    #[serde(default)]
    pub yields: Vec<String>,
}

/// A recipe definition in a data file. Inputs and the output are
/// `(resource_name, amount)` pairs.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeData {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<(String, f64)>,
    pub output: (String, f64),
    /// Work units per cycle; zero means instant.
    pub work: f64,
    #[serde(default)]
    pub research_cost: f64,
}

/// A building type definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildingData {
    pub name: String,
    pub cost: f64,
    pub recipes: Vec<String>,
}

/// A complete content definition set.
#[derive(Debug, Clone, Deserialize)]
pub struct GameData {
    pub resources: Vec<ResourceData>,
    pub recipes: Vec<RecipeData>,
    pub buildings: Vec<BuildingData>,
}

/// World tuning configuration, typically a TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigData {
    #[serde(default = "default_starting_balance")]
    pub starting_balance: f64,
    #[serde(default = "default_base_work")]
    pub base_work: f64,
    #[serde(default = "default_research_rate")]
    pub research_per_researcher: f64,
    #[serde(default = "default_tech_base_cost")]
    pub tech_base_cost: f64,
    #[serde(default)]
    pub seed: u64,
}

fn default_starting_balance() -> f64 {
    500.0
}

fn default_base_work() -> f64 {
    1.0
}

fn default_research_rate() -> f64 {
    1.0
}

fn default_tech_base_cost() -> f64 {
    50.0
}

impl Default for ConfigData {
    fn default() -> Self {
        Self {
            starting_balance: default_starting_balance(),
            base_work: default_base_work(),
            research_per_researcher: default_research_rate(),
            tech_base_cost: default_tech_base_cost(),
            seed: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_resource_from_ron() {
        let data: ResourceData = ron::from_str(
            r#"(
                name: "ore",
                equilibrium: 2000.0,
                initial_local_supply: 300.0,
                initial_global_supply: 3000.0,
                yields: ["iron", "copper"],
            )"#,
        )
        .unwrap();
        assert_eq!(data.name, "ore");
        assert_eq!(data.yields, vec!["iron", "copper"]);
    }

    #[test]
    fn yields_default_to_empty() {
        let data: ResourceData = ron::from_str(
            r#"(
                name: "grain",
                equilibrium: 1000.0,
                initial_local_supply: 500.0,
                initial_global_supply: 5000.0,
            )"#,
        )
        .unwrap();
        assert!(data.yields.is_empty());
    }

    #[test]
    fn parse_recipe_from_ron() {
        let data: RecipeData = ron::from_str(
            r#"(
                name: "mill_flour",
                inputs: [("grain", 2.0)],
                output: ("flour", 1.0),
                work: 3.0,
                research_cost: 10.0,
            )"#,
        )
        .unwrap();
        assert_eq!(data.inputs.len(), 1);
        assert_eq!(data.output.0, "flour");
    }

    #[test]
    fn recipe_inputs_and_research_default() {
        let data: RecipeData = ron::from_str(
            r#"(
                name: "grow_grain",
                output: ("grain", 4.0),
                work: 2.0,
            )"#,
        )
        .unwrap();
        assert!(data.inputs.is_empty());
        assert_eq!(data.research_cost, 0.0);
    }

    #[test]
    fn parse_config_from_toml() {
        let config: ConfigData = toml::from_str(
            r#"
                starting_balance = 750.0
                seed = 42
            "#,
        )
        .unwrap();
        assert_eq!(config.starting_balance, 750.0);
        assert_eq!(config.seed, 42);
        // Unspecified fields take defaults.
        assert_eq!(config.base_work, 1.0);
    }
}
