use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "clinical-narrative";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log filter used when RUST_LOG is not set.
pub fn default_log_filter() -> &'static str {
    "clinical_narrative_lib=info,clinical_narrative=info"
}

/// Get the application data directory (~/.clinical-narrative/).
/// None when the home directory cannot be determined.
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(format!(".{APP_NAME}")))
}

/// Directory searched for reference-table overrides when none is given.
pub fn default_reference_dir() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join("reference"))
}
