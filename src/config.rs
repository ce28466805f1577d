//! The five external inputs of spec.md §6, independent of how the CLI
//! collaborator gathers them.

use std::path::PathBuf;

/// Mirrors Go's `"."` / `"./..."` / concrete-path selector vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSelector {
    /// `.`: just the crate root (`src/main.rs` or `src/lib.rs` and whatever
    /// it `mod`-declares).
    Here,
    /// `./...`: every `.rs` file reachable by walking `mod` declarations
    /// from every binary/library entry point in the crate.
    Recursive,
    /// A concrete relative path to one file.
    Path(PathBuf),
}

impl std::str::FromStr for PackageSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "." => PackageSelector::Here,
            "./..." | "..." => PackageSelector::Recursive,
            other => PackageSelector::Path(PathBuf::from(other)),
        })
    }
}

#[derive(Debug, Clone)]
pub struct InstrumentConfig {
    pub application_root_path: PathBuf,
    pub package_selector: PackageSelector,
    /// Empty means "omit the app-name config call" (spec.md §4.4.1 step 1).
    pub app_name: String,
    pub agent_variable_name: String,
    pub diff_output_path: PathBuf,
}

impl InstrumentConfig {
    pub fn new(application_root_path: impl Into<PathBuf>, diff_output_path: impl Into<PathBuf>) -> Self {
        Self {
            application_root_path: application_root_path.into(),
            package_selector: PackageSelector::Here,
            app_name: String::new(),
            agent_variable_name: "NewRelicAgent".to_string(),
            diff_output_path: diff_output_path.into(),
        }
    }
}
