use std::path::Path;

use bevy::prelude::*;

use terrain::TerrainSettings;

/// Environment variable naming a JSON file with [`TerrainSettings`].
pub const CONFIG_ENV_VAR: &str = "QUADTERRAIN_CONFIG";

/// Parses and validates settings. Missing fields take their defaults.
pub fn parse_settings(json: &str) -> Result<TerrainSettings, String> {
    let settings: TerrainSettings = serde_json::from_str(json).map_err(|e| e.to_string())?;
    settings.validate().map_err(|e| e.to_string())?;
    Ok(settings)
}

fn read_settings(path: &Path) -> Result<TerrainSettings, String> {
    let json = std::fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
    parse_settings(&json)
}

/// Startup system: inserts [`TerrainSettings`] from `$QUADTERRAIN_CONFIG`,
/// falling back to defaults when the variable is unset or the file is bad.
pub fn load_settings(mut commands: Commands) {
    let settings = match std::env::var(CONFIG_ENV_VAR) {
        Ok(path) => match read_settings(Path::new(&path)) {
            Ok(settings) => {
                info!("Loaded terrain settings from {path}");
                settings
            }
            Err(err) => {
                warn!("Ignoring {CONFIG_ENV_VAR}: {err}; using defaults");
                TerrainSettings::default()
            }
        },
        Err(_) => TerrainSettings::default(),
    };
    commands.insert_resource(settings);
}
