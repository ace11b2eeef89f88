use log::{info, warn};

use crate::fsops::{self, ClearOutcome};
use crate::module::{MaintenanceModule, ModuleContext};
use crate::{Error, Result};

pub const MODULE_PATH: &str = "modules/settings/reset-user-settings";

/// Wipes the per-user profile directories and the machine-wide settings
/// file, returning the suite to its first-launch defaults.
pub struct ResetUserSettings;

impl MaintenanceModule for ResetUserSettings {
    fn confirmation_text(&self) -> Option<String> {
        Some(
            "This deletes all player profiles, per-user settings and saved bay \
             layouts, and restores the machine-wide defaults. Every user on this \
             machine is affected."
                .to_string(),
        )
    }

    fn run(&mut self, ctx: &ModuleContext) -> Result<()> {
        let mut failed = 0usize;
        for dir in &ctx.paths.user_settings_dirs {
            match fsops::clear_dir_contents(dir, ctx.config.dry_run) {
                Ok(ClearOutcome::Missing) => info!("{}: not present, skipping", dir.display()),
                Ok(ClearOutcome::AlreadyEmpty) => info!("{}: already empty", dir.display()),
                Ok(ClearOutcome::Cleared(stats)) => {
                    if stats.skipped > 0 {
                        warn!("{}: {} entries left behind", dir.display(), stats.skipped);
                    }
                    info!("{}: removed {} files, {} folders", dir.display(), stats.files, stats.dirs);
                }
                Err(e) => {
                    warn!("{}: {}", dir.display(), e);
                    failed += 1;
                }
            }
        }

        let machine = &ctx.paths.machine_settings;
        match fsops::remove_file_if_present(machine, ctx.config.dry_run) {
            Ok(true) => info!("{}: removed", machine.display()),
            Ok(false) => info!("{}: not present, skipping", machine.display()),
            Err(e) => {
                warn!("{}: {}", machine.display(), e);
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(Error::Operation(format!(
                "{} settings locations could not be reset",
                failed
            )));
        }
        Ok(())
    }
}
