use log::{info, warn};

use crate::module::ModuleContext;
use crate::modules;
use crate::registry::ModuleDescriptor;

/// What happened to one menu selection. Failures are carried as text; the
/// menu loop never sees a module error as anything but a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No implementation registered under the descriptor's path.
    SkippedNotFound,
    /// The operator declined the confirmation prompt.
    SkippedNoConfirm,
    Success,
    Failure(String),
}

/// Resolve a descriptor to a fresh module instance, gate it behind
/// confirmation when it asks for one, and run it.
///
/// The instance lives only for this call. Dropping it on every path is what
/// keeps one invocation's state out of the next, whether that is the same
/// module twice or two different modules in sequence.
pub fn dispatch(
    descriptor: &ModuleDescriptor,
    ctx: &ModuleContext,
    mut confirm: impl FnMut(&str) -> bool,
) -> DispatchOutcome {
    let Some(mut module) = modules::instantiate(descriptor) else {
        warn!("module `{}` is not registered, skipping", descriptor.path);
        return DispatchOutcome::SkippedNotFound;
    };

    if let Some(text) = module.confirmation_text() {
        if !confirm(&text) {
            info!("`{}` declined, nothing changed", descriptor.title);
            return DispatchOutcome::SkippedNoConfirm;
        }
    }

    match module.run(ctx) {
        Ok(()) => {
            info!("`{}` completed", descriptor.title);
            DispatchOutcome::Success
        }
        Err(e) => {
            warn!("`{}` failed: {}", descriptor.title, e);
            DispatchOutcome::Failure(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Paths};
    use crate::tasks::testing::MemoryScheduler;

    fn fixture_paths(root: &std::path::Path) -> Paths {
        Paths {
            product_root: root.join("Simulator"),
            video_root: root.join("VideoManagement"),
            user_settings_dirs: vec![root.join("Profiles")],
            machine_settings: root.join("MachineSettings.json"),
        }
    }

    #[test]
    fn unknown_path_is_a_benign_skip() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::default();
        let paths = fixture_paths(tmp.path());
        let tasks = MemoryScheduler::new();
        let ctx = ModuleContext { config: &config, paths: &paths, tasks: &tasks };
        let ghost = ModuleDescriptor { path: "modules/cache/defrag", title: "Defragment" };
        let outcome = dispatch(&ghost, &ctx, |_| panic!("must not prompt"));
        assert_eq!(outcome, DispatchOutcome::SkippedNotFound);
    }

    #[test]
    fn refusal_leaves_targets_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = fixture_paths(tmp.path());
        let cache = paths.product_root.join("Cache");
        std::fs::create_dir_all(&cache).unwrap();
        std::fs::write(cache.join("course.pak"), b"texture data").unwrap();

        let config = Config::default();
        let tasks = MemoryScheduler::new();
        let ctx = ModuleContext { config: &config, paths: &paths, tasks: &tasks };
        let clear = ModuleDescriptor { path: "modules/cache/clear-caches", title: "Clear simulator caches" };

        let outcome = dispatch(&clear, &ctx, |_| false);
        assert_eq!(outcome, DispatchOutcome::SkippedNoConfirm);
        assert!(cache.join("course.pak").exists());
    }

    #[test]
    fn repeat_dispatches_behave_identically() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = fixture_paths(tmp.path());
        let config = Config::default();
        let tasks = MemoryScheduler::new();
        let ctx = ModuleContext { config: &config, paths: &paths, tasks: &tasks };
        let clear = ModuleDescriptor { path: "modules/cache/clear-caches", title: "Clear simulator caches" };

        // Fresh instance per invocation: a second run over the same (now
        // missing) targets must not see anything from the first.
        let first = dispatch(&clear, &ctx, |_| true);
        let second = dispatch(&clear, &ctx, |_| true);
        assert_eq!(first, DispatchOutcome::Success);
        assert_eq!(second, DispatchOutcome::Success);
    }

    #[test]
    fn confirmation_text_reaches_the_gate() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = fixture_paths(tmp.path());
        let config = Config::default();
        let tasks = MemoryScheduler::new();
        let ctx = ModuleContext { config: &config, paths: &paths, tasks: &tasks };
        let clear = ModuleDescriptor { path: "modules/cache/clear-caches", title: "Clear simulator caches" };

        let mut seen = String::new();
        let _ = dispatch(&clear, &ctx, |text| {
            seen = text.to_string();
            false
        });
        assert!(seen.contains("cache"), "prompt text: {seen}");
    }
}
