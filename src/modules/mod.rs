//! The maintenance modules themselves, one file per category.

pub mod cache;
pub mod settings;
pub mod touch;

use crate::module::MaintenanceModule;
use crate::registry::ModuleDescriptor;

/// Factory keyed by descriptor path. Every call builds a brand-new instance;
/// the loader drops it when the invocation ends, so no module state survives
/// into the next selection. Unknown paths resolve to `None`.
pub fn instantiate(descriptor: &ModuleDescriptor) -> Option<Box<dyn MaintenanceModule>> {
    match descriptor.path {
        cache::CLEAR_MODULE_PATH => Some(Box::new(cache::ClearCaches)),
        cache::STARTUP_MODULE_PATH => Some(Box::new(cache::StartupClearing)),
        settings::MODULE_PATH => Some(Box::new(settings::ResetUserSettings)),
        touch::MODULE_PATH => Some(Box::new(touch::ResetCalibration)),
        _ => None,
    }
}
