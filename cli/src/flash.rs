use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
};

use usbprog::{
    DeviceDiscovery, Flasher, ModeSwitch, NusbHandle, NusbTransport,
    ProgressSink, UpdateDevice,
};

use crate::CliError;
use crate::targets::builtin_targets;

/// Textual progress bar in the terminal.
struct BarProgress;

impl ProgressSink for BarProgress {
    fn progressed(&mut self, total: f64, now: f64) -> bool {
        let percentage = (100.0 * now / total) as usize;
        let filled = (60.0 * now / total) as usize;
        print!(
            "\r  Flashing {:3}% [{}]",
            percentage,
            "#".repeat(filled) + &" ".repeat(60 - filled)
        );
        let _ = io::stdout().flush();
        true
    }

    fn finished(&mut self) {
        println!();
    }
}

pub(crate) fn flash_file(
    file: &PathBuf,
    device: Option<usize>,
    no_start: bool,
) -> Result<(), CliError> {
    let data = fs::read(file)?;
    let transport = NusbTransport::new();

    let mut discovery = DeviceDiscovery::new();
    discovery.discover(&transport, &builtin_targets())?;
    let target = select_target(&mut discovery, device)?;

    let device = into_update_mode(&transport, &mut discovery, target)?;

    let mut flasher = Flasher::new();
    flasher.set_progress(Box::new(BarProgress));
    flasher.open(&transport, &device)?;

    println!("Writing {} bytes from {}...", data.len(), file.display());
    flasher.write_firmware(&data)?;
    if !no_start {
        println!("Starting firmware...");
        if let Err(err) = flasher.start_device() {
            let _ = flasher.close();
            return Err(err.into());
        }
    }
    flasher.close()?;
    Ok(())
}

pub(crate) fn switch_device(device: Option<usize>) -> Result<(), CliError> {
    let transport = NusbTransport::new();
    let mut discovery = DeviceDiscovery::new();
    discovery.discover(&transport, &builtin_targets())?;

    let target = select_target(&mut discovery, device)?;
    if target.update_mode() {
        println!("{target} is already in update mode");
        return Ok(());
    }
    into_update_mode(&transport, &mut discovery, target)?;
    println!("Device is in update mode");
    Ok(())
}

pub(crate) fn start_device(device: Option<usize>) -> Result<(), CliError> {
    with_open_flasher(device, |flasher| {
        println!("Starting firmware...");
        flasher.start_device()
    })
}

pub(crate) fn reset_device(device: Option<usize>) -> Result<(), CliError> {
    with_open_flasher(device, |flasher| {
        println!("Resetting device...");
        flasher.reset_device()
    })
}

/// Resolve the device a command operates on: an explicit `--device` number,
/// the current update device, or the only attached candidate.
fn select_target(
    discovery: &mut DeviceDiscovery,
    device: Option<usize>,
) -> Result<UpdateDevice, CliError> {
    if let Some(number) = device {
        let target = discovery.device(number)?.clone();
        discovery.set_current(number);
        return Ok(target);
    }
    if let Some(target) = discovery.current_update_device() {
        return Ok(target.clone());
    }
    match discovery.devices() {
        [] => Err(CliError::NoDevice),
        [only] => Ok(only.clone()),
        many => Err(CliError::ManyDevices(many.len())),
    }
}

/// Mode-switch `target` if needed and return the update-mode record to
/// flash, freshly resolved after rediscovery.
fn into_update_mode(
    transport: &NusbTransport,
    discovery: &mut DeviceDiscovery,
    target: UpdateDevice,
) -> Result<UpdateDevice, CliError> {
    if !target.update_mode() {
        println!("Switching {target} to update mode...");
        ModeSwitch::new().switch_to_update_mode(
            transport,
            discovery,
            &builtin_targets(),
            &target,
        )?;
    }
    discovery
        .current_update_device()
        .cloned()
        .ok_or(CliError::NoDevice)
}

fn with_open_flasher<F>(device: Option<usize>, op: F) -> Result<(), CliError>
where
    F: FnOnce(&mut Flasher<NusbHandle>) -> Result<(), usbprog::UpdateError>,
{
    let transport = NusbTransport::new();
    let mut discovery = DeviceDiscovery::new();
    discovery.discover(&transport, &builtin_targets())?;
    let target = select_target(&mut discovery, device)?;

    let mut flasher = Flasher::new();
    flasher.open(&transport, &target)?;
    let result = op(&mut flasher);
    if flasher.is_open() {
        flasher.close()?;
    }
    Ok(result?)
}
