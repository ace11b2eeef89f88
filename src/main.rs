#[cfg(windows)]
mod windows_main {
    use std::ffi::OsString;
    use std::io;

    use clap::{Parser, ValueEnum};
    use log::{debug, error, info};

    use swingbay_toolkit::elevation::{self, Privileges};
    use swingbay_toolkit::menu::MenuLoop;
    use swingbay_toolkit::modules::cache;
    use swingbay_toolkit::tasks::SchtasksScheduler;
    use swingbay_toolkit::{load_config, MaintenanceModule, ModuleContext, Paths, MODULES};

    #[derive(Debug, Parser)]
    #[command(
        name = "swingbay-toolkit",
        version,
        long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_COMMIT"), ", ", env!("GIT_DESCRIBE"), ")"),
        about = "Maintenance toolkit for SwingBay golf-simulator bays (Windows 10/11)"
    )]
    struct Cli {
        /// Interactive drives the console menu; startup is the unattended
        /// mode the boot task uses and only clears the simulator caches
        #[arg(long, value_enum, default_value = "interactive")]
        mode: Mode,

        /// Walk the targets and report without deleting anything
        #[arg(long)]
        dry_run: bool,

        /// Increase verbosity (overrides quiet)
        #[arg(long)]
        verbose: bool,

        /// Silence most output
        #[arg(long)]
        quiet: bool,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
    enum Mode {
        Interactive,
        Startup,
    }

    fn init_logging(quiet: bool, verbose: bool) {
        let default_level = if quiet {
            "error"
        } else if verbose {
            "debug"
        } else {
            "info"
        };
        let env = env_logger::Env::default().default_filter_or(default_level);
        let _ = env_logger::Builder::from_env(env).try_init();
        debug!("logger initialized with level: {}", default_level);
    }

    pub fn run() {
        let cli = Cli::parse();

        // CLI > config file
        let mut cfg = load_config();
        if cli.dry_run { cfg.dry_run = true; }
        if cli.verbose { cfg.verbose = true; cfg.quiet = false; }
        if cli.quiet { cfg.quiet = true; cfg.verbose = false; }

        init_logging(cfg.quiet, cfg.verbose);
        info!("SwingBay maintenance toolkit starting ({:?} mode)", cli.mode);

        // Both the elevated relaunch and the boot task point at this binary;
        // refuse to start if that path cannot be resolved.
        if let Err(e) = std::env::current_exe() {
            error!("could not resolve the toolkit's own path: {}", e);
            std::process::exit(1);
        }

        // Every module here is destructive; nothing runs without elevation.
        // The elevated child re-enters with the same arguments.
        if elevation::check() == Privileges::NotElevated {
            info!("not elevated, relaunching with administrative rights");
            let args: Vec<OsString> = std::env::args_os().skip(1).collect();
            match elevation::relaunch_elevated(&args) {
                Ok(()) => return,
                Err(e) => {
                    error!("could not acquire administrative rights: {}", e);
                    std::process::exit(1);
                }
            }
        }

        let paths = Paths::from_env();
        let tasks = SchtasksScheduler;
        let ctx = ModuleContext { config: &cfg, paths: &paths, tasks: &tasks };

        match cli.mode {
            Mode::Startup => {
                info!("clearing simulator caches (unattended)");
                let mut sweep = cache::ClearCaches;
                if let Err(e) = sweep.run(&ctx) {
                    error!("startup cache clearing failed: {}", e);
                    std::process::exit(1);
                }
            }
            Mode::Interactive => {
                let stdin = io::stdin();
                let mut menu = MenuLoop::new(MODULES, stdin.lock(), io::stdout());
                if let Err(e) = menu.run(&ctx) {
                    error!("console I/O failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

#[cfg(windows)]
fn main() {
    windows_main::run();
}

#[cfg(not(windows))]
fn main() {
    eprintln!("The SwingBay maintenance toolkit supports Windows 10/11 only. Exiting.");
    std::process::exit(2);
}
