use crate::error::{GreenhouseError, Result};
use crate::models::PlantProfile;
use std::path::Path;

/// Reads every `*.yaml` / `*.yml` plant profile in `dir`, sorted by file name.
/// Unknown action tokens or inverted ranges fail the whole import.
pub fn load_profiles_dir(dir: &Path) -> Result<Vec<PlantProfile>> {
    if !dir.is_dir() {
        return Err(GreenhouseError::NotFound(format!(
            "profile directory {:?}",
            dir
        )));
    }

    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("yaml") | Some("yml")
            )
        })
        .collect();
    paths.sort();

    paths.iter().map(|p| load_profile_file(p)).collect()
}

pub fn load_profile_file(path: &Path) -> Result<PlantProfile> {
    let content = std::fs::read_to_string(path)?;
    let profile: PlantProfile = serde_yaml::from_str(&content).map_err(|e| {
        GreenhouseError::InvalidData(format!("{}: {}", path.display(), e))
    })?;
    profile
        .validate()
        .map_err(|e| GreenhouseError::InvalidData(format!("{}: {}", path.display(), e)))?;
    tracing::debug!(profile = %profile.id, path = %path.display(), "Loaded plant profile");
    Ok(profile)
}
