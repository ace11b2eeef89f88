/// Root keyword under which module paths live; the segment after it names
/// the menu category.
pub const MODULE_ROOT: &str = "modules";

const FALLBACK_CATEGORY: &str = "general";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleDescriptor {
    /// Stable identifier, also the factory key in `modules::instantiate`.
    pub path: &'static str,
    /// Title shown in the menu.
    pub title: &'static str,
}

impl ModuleDescriptor {
    /// First path segment under the module root, or the fallback category.
    pub fn category(&self) -> &'static str {
        let Some(rest) = self.path.strip_prefix(MODULE_ROOT).and_then(|r| r.strip_prefix('/')) else {
            return FALLBACK_CATEGORY;
        };
        match rest.split_once('/') {
            Some((category, _)) if !category.is_empty() => category,
            _ => FALLBACK_CATEGORY,
        }
    }
}

/// The full registry, fixed at compile time. Order here is incidental; the
/// menu sorts by category and title before assigning ordinals.
pub const MODULES: &[ModuleDescriptor] = &[
    ModuleDescriptor { path: crate::modules::cache::CLEAR_MODULE_PATH, title: "Clear simulator caches" },
    ModuleDescriptor { path: crate::modules::cache::STARTUP_MODULE_PATH, title: "Toggle automatic cache clearing at startup" },
    ModuleDescriptor { path: crate::modules::settings::MODULE_PATH, title: "Reset per-user settings" },
    ModuleDescriptor { path: crate::modules::touch::MODULE_PATH, title: "Reset touch screen calibration" },
];
