use std::path::Path;
use std::time::Duration;

use log::{info, warn};

use crate::fsops::{self, ClearOutcome};
use crate::module::{MaintenanceModule, ModuleContext};
use crate::tasks::{TaskDefinition, TaskScheduler, TaskState};
use crate::{Error, Result};

pub const CLEAR_MODULE_PATH: &str = "modules/cache/clear-caches";
pub const STARTUP_MODULE_PATH: &str = "modules/cache/startup-clearing";

/// Singleton key into the OS task store.
pub const TASK_NAME: &str = "SwingBay Cache Cleanup";

/// Ceiling on a scheduled cleanup run, enforced by the OS.
const TASK_TIME_LIMIT: Duration = Duration::from_secs(30 * 60);

/// LocalSystem.
const TASK_PRINCIPAL: &str = "S-1-5-18";

// ---------- cache clearing ----------

pub struct ClearCaches;

impl MaintenanceModule for ClearCaches {
    fn confirmation_text(&self) -> Option<String> {
        Some(
            "This removes all cached simulator data (course textures, temp files \
             and recorded swing videos). The simulator rebuilds its caches on the \
             next launch."
                .to_string(),
        )
    }

    fn run(&mut self, ctx: &ModuleContext) -> Result<()> {
        let targets = ctx.paths.cache_targets();
        let total = targets.len();
        let mut failed = 0usize;
        for dir in &targets {
            match fsops::clear_dir_contents(dir, ctx.config.dry_run) {
                Ok(ClearOutcome::Missing) => info!("{}: not present, skipping", dir.display()),
                Ok(ClearOutcome::AlreadyEmpty) => info!("{}: already empty", dir.display()),
                Ok(ClearOutcome::Cleared(stats)) => {
                    if stats.skipped > 0 {
                        warn!("{}: {} entries left behind (locked or access denied)", dir.display(), stats.skipped);
                    }
                    info!(
                        "{}: removed {} files, {} folders ({})",
                        dir.display(),
                        stats.files,
                        stats.dirs,
                        fsops::format_bytes(stats.bytes)
                    );
                }
                Err(e) => {
                    // One folder failing never aborts the rest of the sweep
                    warn!("{}: {}", dir.display(), e);
                    failed += 1;
                }
            }
        }
        if failed > 0 {
            return Err(Error::Operation(format!(
                "{} of {} cache folders could not be cleared",
                failed, total
            )));
        }
        Ok(())
    }
}

// ---------- startup task state machine ----------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupState {
    Unregistered,
    Registered(TaskState),
}

/// Re-derive the state from the OS every time; nothing is cached, so a task
/// deleted behind our back shows up on the next query.
pub fn startup_state(tasks: &dyn TaskScheduler) -> Result<StartupState> {
    Ok(match tasks.query(TASK_NAME)? {
        None => StartupState::Unregistered,
        Some(state) => StartupState::Registered(state),
    })
}

/// The full registration this toolkit wants: run ourselves in startup mode
/// at boot, as LocalSystem, with a bounded execution time.
pub fn startup_task_definition(target: &Path) -> TaskDefinition {
    TaskDefinition {
        name: TASK_NAME.to_string(),
        command: target.to_path_buf(),
        arguments: "--mode startup".to_string(),
        principal: TASK_PRINCIPAL.to_string(),
        highest_privileges: true,
        run_at_boot: true,
        start_when_available: true,
        execution_time_limit: TASK_TIME_LIMIT,
    }
}

/// Register the startup task, replacing any existing registration under the
/// fixed name. Delete-then-create, not an additive update; a failure between
/// the two steps can leave the task absent (best effort, no rollback).
pub fn enable_startup_clearing(tasks: &dyn TaskScheduler, target: &Path) -> Result<()> {
    if !target.exists() {
        return Err(Error::Operation(format!(
            "refusing to register a boot task for a nonexistent target: {}",
            target.display()
        )));
    }
    tasks.delete(TASK_NAME)?;
    tasks.register(&startup_task_definition(target))
}

/// Unregister by fixed name. Returns whether anything existed; absence is
/// already-satisfied, not an error.
pub fn disable_startup_clearing(tasks: &dyn TaskScheduler) -> Result<bool> {
    tasks.delete(TASK_NAME)
}

/// Menu toggle. The direction comes from a fresh query, never from anything
/// remembered across renders or selections.
pub struct StartupClearing;

impl MaintenanceModule for StartupClearing {
    fn run(&mut self, ctx: &ModuleContext) -> Result<()> {
        match startup_state(ctx.tasks)? {
            StartupState::Unregistered => {
                let exe = std::env::current_exe().map_err(Error::SelfPath)?;
                if ctx.config.dry_run {
                    info!("[dry-run] would register `{}` pointing at {}", TASK_NAME, exe.display());
                    return Ok(());
                }
                enable_startup_clearing(ctx.tasks, &exe)?;
                info!("automatic cache clearing at startup enabled");
            }
            StartupState::Registered(state) => {
                if ctx.config.dry_run {
                    info!("[dry-run] would delete `{}` (currently {})", TASK_NAME, state);
                    return Ok(());
                }
                if disable_startup_clearing(ctx.tasks)? {
                    info!("automatic cache clearing at startup disabled");
                } else {
                    info!("automatic cache clearing was already disabled");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Paths};
    use crate::tasks::testing::MemoryScheduler;
    use std::fs;
    use std::path::PathBuf;

    fn fixture_paths(root: &Path) -> Paths {
        Paths {
            product_root: root.join("Simulator"),
            video_root: root.join("VideoManagement"),
            user_settings_dirs: vec![],
            machine_settings: root.join("MachineSettings.json"),
        }
    }

    fn self_target() -> PathBuf {
        // The test binary itself: a path that is guaranteed to exist
        std::env::current_exe().unwrap()
    }

    #[test]
    fn definition_pins_the_boot_contract() {
        let def = startup_task_definition(Path::new(r"C:\SwingBay\toolkit.exe"));
        assert_eq!(def.name, TASK_NAME);
        assert_eq!(def.arguments, "--mode startup");
        assert_eq!(def.principal, "S-1-5-18");
        assert!(def.highest_privileges && def.run_at_boot && def.start_when_available);
        assert_eq!(def.execution_time_limit, Duration::from_secs(1800));
    }

    #[test]
    fn enable_then_disable_returns_to_unregistered() {
        let tasks = MemoryScheduler::new();
        assert_eq!(startup_state(&tasks).unwrap(), StartupState::Unregistered);

        enable_startup_clearing(&tasks, &self_target()).unwrap();
        assert!(matches!(startup_state(&tasks).unwrap(), StartupState::Registered(_)));

        assert!(disable_startup_clearing(&tasks).unwrap());
        assert_eq!(startup_state(&tasks).unwrap(), StartupState::Unregistered);
    }

    #[test]
    fn disable_when_absent_is_a_no_op() {
        let tasks = MemoryScheduler::new();
        assert!(!disable_startup_clearing(&tasks).unwrap());
    }

    #[test]
    fn enable_replaces_an_existing_registration_wholesale() {
        let tasks = MemoryScheduler::new();
        let stale = TaskDefinition {
            name: TASK_NAME.to_string(),
            command: PathBuf::from(r"C:\old\toolkit.exe"),
            arguments: "--legacy".to_string(),
            principal: "Operator".to_string(),
            highest_privileges: false,
            run_at_boot: false,
            start_when_available: false,
            execution_time_limit: Duration::from_secs(60),
        };
        tasks.seed(stale, TaskState::Disabled);

        let target = self_target();
        enable_startup_clearing(&tasks, &target).unwrap();

        // The stored definition is exactly the new request, not a merge
        let stored = tasks.stored(TASK_NAME).unwrap();
        assert_eq!(stored, startup_task_definition(&target));
    }

    #[test]
    fn enable_refuses_a_missing_target() {
        let tasks = MemoryScheduler::new();
        let err = enable_startup_clearing(&tasks, Path::new("/definitely/not/here.exe")).unwrap_err();
        assert!(err.to_string().contains("nonexistent target"));
        assert_eq!(startup_state(&tasks).unwrap(), StartupState::Unregistered);
    }

    #[test]
    fn toggle_module_flips_both_ways() {
        let tasks = MemoryScheduler::new();
        let config = Config::default();
        let tmp = tempfile::tempdir().unwrap();
        let paths = fixture_paths(tmp.path());
        let ctx = ModuleContext { config: &config, paths: &paths, tasks: &tasks };

        StartupClearing.run(&ctx).unwrap();
        assert!(matches!(startup_state(&tasks).unwrap(), StartupState::Registered(_)));

        StartupClearing.run(&ctx).unwrap();
        assert_eq!(startup_state(&tasks).unwrap(), StartupState::Unregistered);
    }

    #[test]
    fn startup_sweep_clears_populated_and_reports_empty() {
        // Populated Cache, empty Temp, missing VideoManagement: the sweep
        // empties the first, skips the others benignly.
        let tmp = tempfile::tempdir().unwrap();
        let paths = fixture_paths(tmp.path());
        let cache_dir = paths.product_root.join("Cache");
        let temp_dir = paths.product_root.join("Temp");
        fs::create_dir_all(&cache_dir).unwrap();
        fs::create_dir_all(&temp_dir).unwrap();
        fs::write(cache_dir.join("hole17.pak"), b"texture").unwrap();
        fs::create_dir(cache_dir.join("shaders")).unwrap();

        let config = Config::default();
        let tasks = MemoryScheduler::new();
        let ctx = ModuleContext { config: &config, paths: &paths, tasks: &tasks };

        ClearCaches.run(&ctx).unwrap();

        assert!(cache_dir.is_dir());
        assert_eq!(fs::read_dir(&cache_dir).unwrap().count(), 0);
        assert!(temp_dir.is_dir());
        assert!(!paths.video_root.exists());
    }

    #[test]
    fn clear_module_asks_for_confirmation() {
        assert!(ClearCaches.confirmation_text().is_some());
        assert!(StartupClearing.confirmation_text().is_none());
    }
}
