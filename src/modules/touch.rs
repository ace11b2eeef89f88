use std::path::PathBuf;
use std::process::Command;

use log::{info, warn};

use crate::module::{MaintenanceModule, ModuleContext};
use crate::{Error, Result};

pub const MODULE_PATH: &str = "modules/touch/reset-calibration";

/// Clears the stored touch calibration for every attached display, then
/// reopens the system calibration tool so the operator can recalibrate.
pub struct ResetCalibration;

impl MaintenanceModule for ResetCalibration {
    fn confirmation_text(&self) -> Option<String> {
        Some(
            "This clears the stored touch calibration for every attached display. \
             The Windows calibration tool opens afterwards so the bay screen can \
             be recalibrated."
                .to_string(),
        )
    }

    fn run(&mut self, ctx: &ModuleContext) -> Result<()> {
        let tool = tabcal_path();
        let displays = attached_displays();
        if displays.is_empty() {
            info!("no attached displays detected, nothing to clear");
        }

        if ctx.config.dry_run {
            for d in &displays {
                info!("[dry-run] would run {} {}", tool.display(), clearcal_args(d).join(" "));
            }
            return Ok(());
        }

        // One synchronous ClearCal call per display; a failing display is
        // logged and the rest still get cleared
        for d in &displays {
            match Command::new(&tool).args(clearcal_args(d)).status() {
                Ok(status) if status.success() => info!("cleared calibration for {}", d),
                Ok(status) => warn!("clearing {} exited with {}", d, status),
                Err(e) => {
                    return Err(Error::io(format!("launching {}", tool.display()), e));
                }
            }
        }

        // Reopen the interactive tool and leave it running
        Command::new(&tool)
            .spawn()
            .map_err(|e| Error::io(format!("launching {}", tool.display()), e))?;
        info!("calibration tool opened for recalibration");
        Ok(())
    }
}

/// `%WINDIR%\System32\tabcal.exe`, the built-in digitizer calibration tool.
fn tabcal_path() -> PathBuf {
    let windir = std::env::var("WINDIR")
        .or_else(|_| std::env::var("SystemRoot"))
        .unwrap_or_else(|_| r"C:\Windows".to_string());
    PathBuf::from(windir).join("System32").join("tabcal.exe")
}

fn clearcal_args(display: &str) -> Vec<String> {
    vec!["ClearCal".to_string(), format!("DisplayID={}", display)]
}

/// Display devices currently attached to the desktop, by device name
/// (`\\.\DISPLAY1`, ...).
#[cfg(windows)]
fn attached_displays() -> Vec<String> {
    use windows_sys::Win32::Graphics::Gdi::{
        EnumDisplayDevicesW, DISPLAY_DEVICEW, DISPLAY_DEVICE_ATTACHED_TO_DESKTOP,
    };

    let mut displays = Vec::new();
    let mut index: u32 = 0;
    loop {
        let mut device: DISPLAY_DEVICEW = unsafe { std::mem::zeroed() };
        device.cb = std::mem::size_of::<DISPLAY_DEVICEW>() as u32;
        let ok = unsafe { EnumDisplayDevicesW(std::ptr::null(), index, &mut device, 0) };
        if ok == 0 {
            break;
        }
        if device.StateFlags & DISPLAY_DEVICE_ATTACHED_TO_DESKTOP != 0 {
            let len = device.DeviceName.iter().position(|&c| c == 0).unwrap_or(device.DeviceName.len());
            displays.push(String::from_utf16_lossy(&device.DeviceName[..len]));
        }
        index += 1;
    }
    displays
}

#[cfg(not(windows))]
fn attached_displays() -> Vec<String> {
    Vec::new()
}
