use std::time::Duration;

use log::{debug, info, warn};

use crate::{
    DeviceDiscovery, UpdateDevice, UpdateError, UpdateTarget, UsbHandle,
    UsbTransport,
};

const MODE_SWITCH_REQUEST: u8 = 0x01;
const MODE_SWITCH_RESPONSE_LEN: u16 = 8;
const MODE_SWITCH_TIMEOUT: Duration = Duration::from_millis(1000);
const MODE_SWITCH_ATTEMPTS: usize = 6;
const RETRY_SLEEP_UNITS: u64 = 1;
const SETTLE_SLEEP_UNITS: u64 = 2000;

/// Capability to wait a number of scaled time units (1 unit = 1 ms for the
/// default implementation).
///
/// GUI callers can implement this by pumping their event loop instead of
/// blocking the thread.
pub trait Sleeper {
    fn sleep(&self, units: u64);
}

/// [`Sleeper`] that blocks the calling thread.
#[derive(Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, units: u64) {
        std::thread::sleep(Duration::from_millis(units));
    }
}

/// Drives a device running application firmware into the bootloader.
pub struct ModeSwitch<S: Sleeper = ThreadSleeper> {
    sleeper: S,
}

impl ModeSwitch<ThreadSleeper> {
    pub fn new() -> Self {
        ModeSwitch {
            sleeper: ThreadSleeper,
        }
    }
}

impl Default for ModeSwitch<ThreadSleeper> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Sleeper> ModeSwitch<S> {
    pub fn with_sleeper(sleeper: S) -> Self {
        ModeSwitch { sleeper }
    }

    /// Switch `device` into update mode and converge `discovery` on the
    /// rebooted bootloader device.
    ///
    /// A no-op for devices already in update mode. On success the previous
    /// explicit selection is restored only if a record with the same
    /// identity still exists after rediscovery; otherwise the selection is
    /// left unset so the usual auto-select picks the bootloader device.
    pub fn switch_to_update_mode<T: UsbTransport>(
        &self,
        transport: &T,
        discovery: &mut DeviceDiscovery,
        targets: &[UpdateTarget],
        device: &UpdateDevice,
    ) -> Result<(), UpdateError> {
        if device.update_mode() {
            debug!("{device} is already in update mode");
            return Ok(());
        }

        info!("switching {device} to update mode");
        {
            let mut handle = transport.open(&device.desc())?;
            handle.activate_configuration()?;
            handle.claim_interface(0)?;
            handle.set_alt_setting(0, 0)?;

            // The device resets itself as soon as it accepts the request, so
            // the transfer often completes with an error or not at all. Every
            // attempt failing is still success from our point of view.
            for attempt in 1..=MODE_SWITCH_ATTEMPTS {
                match handle.control_in(
                    MODE_SWITCH_REQUEST,
                    0,
                    0,
                    MODE_SWITCH_RESPONSE_LEN,
                    MODE_SWITCH_TIMEOUT,
                ) {
                    Ok(_) => break,
                    Err(err) => {
                        warn!("mode switch attempt {attempt} unanswered: {err}");
                        if attempt < MODE_SWITCH_ATTEMPTS {
                            self.sleeper.sleep(RETRY_SLEEP_UNITS);
                        }
                    }
                }
            }
            // handle dropped here, releasing interface 0 and the device
        }

        // give the OS time to enumerate the rebooted device
        self.sleeper.sleep(SETTLE_SLEEP_UNITS);

        let previous = discovery
            .current_index()
            .and_then(|index| discovery.devices().get(index).cloned());
        discovery.discover(transport, targets)?;
        if let Some(previous) = previous
            && let Some(index) =
                discovery.devices().iter().position(|dev| *dev == previous)
        {
            discovery.set_current(index);
        }
        Ok(())
    }
}
