use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Runtime flags. CLI flags override whatever the config file provides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)] pub dry_run: bool,
    #[serde(default)] pub verbose: bool,
    #[serde(default)] pub quiet: bool,
}

pub fn load_config() -> Config {
    // Search order: CWD/.swingbay/config.json, %PROGRAMDATA%/SwingBay/config.json, %APPDATA%/SwingBay/config.json
    let mut paths: Vec<PathBuf> = Vec::new();
    if let Ok(cwd) = std::env::current_dir() { paths.push(cwd.join(".swingbay/config.json")); }
    if let Ok(pd) = std::env::var("ProgramData") { paths.push(Path::new(&pd).join("SwingBay/config.json")); }
    if let Ok(ad) = std::env::var("APPDATA") { paths.push(Path::new(&ad).join("SwingBay/config.json")); }

    for p in paths {
        if p.is_file() {
            if let Ok(s) = fs::read_to_string(&p) {
                if let Ok(c) = serde_json::from_str::<Config>(&s) {
                    return c;
                }
            }
        }
    }
    Config::default()
}

/// Every filesystem location the modules touch, resolved once at startup and
/// passed in explicitly so tests can point the modules at fixture trees.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Simulator install root, e.g. `C:\Program Files (x86)\SwingBay\Simulator`.
    pub product_root: PathBuf,
    /// Recorded swing video store, a sibling of the product root.
    pub video_root: PathBuf,
    /// Per-user profile directories wiped by the settings reset.
    pub user_settings_dirs: Vec<PathBuf>,
    /// Machine-wide settings file removed by the settings reset.
    pub machine_settings: PathBuf,
}

impl Paths {
    pub fn from_env() -> Self {
        let vendor = std::env::var("ProgramFiles(x86)")
            .or_else(|_| std::env::var("ProgramFiles"))
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(r"C:\Program Files (x86)"))
            .join("SwingBay");
        let appdata = env_dir("APPDATA");
        let localappdata = env_dir("LOCALAPPDATA");
        let programdata = std::env::var("ProgramData")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(r"C:\ProgramData"));

        Paths {
            product_root: vendor.join("Simulator"),
            video_root: vendor.join("VideoManagement"),
            user_settings_dirs: vec![
                appdata.join("SwingBay/Profiles"),
                localappdata.join("SwingBay/Settings"),
                localappdata.join("SwingBay/Layouts"),
            ],
            machine_settings: programdata.join("SwingBay/MachineSettings.json"),
        }
    }

    /// The three cache folders cleared by the cache module, in sweep order.
    pub fn cache_targets(&self) -> Vec<PathBuf> {
        vec![
            self.product_root.join("Cache"),
            self.product_root.join("Temp"),
            self.video_root.clone(),
        ]
    }
}

fn env_dir(name: &str) -> PathBuf {
    std::env::var(name).map(PathBuf::from).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_are_off() {
        let c = Config::default();
        assert!(!c.dry_run && !c.verbose && !c.quiet);
    }

    #[test]
    fn config_parses_partial_json() {
        let c: Config = serde_json::from_str(r#"{"verbose": true}"#).unwrap();
        assert!(c.verbose);
        assert!(!c.dry_run);
    }

    #[test]
    fn cache_targets_are_stable() {
        let p = Paths {
            product_root: PathBuf::from("/fixture/Simulator"),
            video_root: PathBuf::from("/fixture/VideoManagement"),
            user_settings_dirs: vec![],
            machine_settings: PathBuf::from("/fixture/MachineSettings.json"),
        };
        let a = p.cache_targets();
        let b = p.cache_targets();
        assert_eq!(a, b);
        assert_eq!(a[0], PathBuf::from("/fixture/Simulator/Cache"));
        assert_eq!(a[1], PathBuf::from("/fixture/Simulator/Temp"));
        assert_eq!(a[2], PathBuf::from("/fixture/VideoManagement"));
    }
}
