use crate::config::{Config, Paths};
use crate::tasks::TaskScheduler;
use crate::Result;

/// Everything a module is allowed to touch. Passed in explicitly so tests
/// can substitute fixture paths and an in-memory task store.
pub struct ModuleContext<'a> {
    pub config: &'a Config,
    pub paths: &'a Paths,
    pub tasks: &'a dyn TaskScheduler,
}

/// The contract every maintenance module satisfies.
///
/// A module that returns confirmation text is destructive and only runs after
/// the operator affirms; `None` means it runs straight away. Instances are
/// created fresh per invocation and dropped afterwards, so implementations
/// must not rely on state surviving across menu selections.
pub trait MaintenanceModule {
    fn confirmation_text(&self) -> Option<String> {
        None
    }

    fn run(&mut self, ctx: &ModuleContext) -> Result<()>;
}
