//! Firmware update engine for USBprog devices, based on [`nusb`]
//!
//! USBprog is a microcontroller programming adapter whose firmware is
//! replaceable over USB: its bootloader accepts 64-byte firmware pages on a
//! bulk endpoint, and application firmwares expose a vendor control request
//! that reboots the device back into the bootloader. This crate implements
//! the host side of that protocol: discovering flashable devices, switching
//! them into update mode and uploading a firmware image.
//!
//! # Example
//!
//! ```no_run
//! use usbprog::{DeviceDiscovery, Flasher, NusbTransport};
//!
//! # fn main() -> Result<(), usbprog::UpdateError> {
//! let transport = NusbTransport::new();
//! let mut discovery = DeviceDiscovery::new();
//! discovery.discover(&transport, &[])?;
//!
//! if let Some(device) = discovery.current_update_device().cloned() {
//!     let mut flasher = Flasher::new();
//!     flasher.open(&transport, &device)?;
//!     flasher.write_firmware(&[0u8; 128])?;
//!     flasher.start_device()?;
//!     flasher.close()?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Everything is synchronous and blocking; callers embedding this in a UI
//! are expected to run it on a worker thread. The engines are generic over
//! [`UsbTransport`], with [`NusbTransport`] as the hardware implementation.
//!
//! [`nusb`]: https://docs.rs/nusb

mod device;
mod discovery;
mod error;
mod flash;
mod host;
mod switch;
#[cfg(test)]
mod testing;
mod transport;

// Re-exports
pub use device::{
    TARGET_UNSET, UPDATE_BCD_DEVICE, UPDATE_PRODUCT_ID, UPDATE_VENDOR_ID,
    UpdateDevice, UpdateTarget,
};
pub use discovery::DeviceDiscovery;
pub use error::UpdateError;
pub use flash::{Flasher, PAGE_SIZE, ProgressSink, WRITE_ENDPOINT};
pub use host::{NusbHandle, NusbTransport};
pub use switch::{ModeSwitch, Sleeper, ThreadSleeper};
pub use transport::{DeviceDesc, UsbHandle, UsbTransport};
