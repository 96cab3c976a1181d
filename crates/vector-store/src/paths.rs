use std::path::PathBuf;

pub const TOOL_DIR_NAME: &str = ".tcode-finder";
pub const CACHE_DIR_NAME: &str = "cache";
pub const MODELS_DIR_NAME: &str = "models";
const USER_CACHE_APP_NAME: &str = "tcode-finder";

/// Project-local cache root: `./.tcode-finder/cache`.
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    PathBuf::from(TOOL_DIR_NAME).join(CACHE_DIR_NAME)
}

/// Model assets directory.
///
/// Resolution order: `TCODE_MODEL_DIR`, a `./models` folder holding a
/// manifest, then the per-user cache dir.
#[must_use]
pub fn model_dir() -> PathBuf {
    if let Ok(path) = std::env::var("TCODE_MODEL_DIR") {
        return PathBuf::from(path);
    }

    let local = PathBuf::from(MODELS_DIR_NAME);
    if local.join("manifest.json").exists() {
        return local;
    }

    dirs::cache_dir()
        .map(|dir| dir.join(USER_CACHE_APP_NAME).join(MODELS_DIR_NAME))
        .unwrap_or(local)
}
