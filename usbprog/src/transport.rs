use std::time::Duration;

use crate::UpdateError;

/// Descriptor fields of one attached physical device, read once at
/// enumeration time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceDesc {
    pub bus_id: String,
    pub address: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub bcd_device: u16,
}

/// Capability to enumerate attached USB devices and open them.
///
/// The update engines never talk to a USB library directly; they are generic
/// over this trait so they can run against [`NusbTransport`] on real hardware
/// and against a scripted fake in tests.
///
/// [`NusbTransport`]: crate::NusbTransport
pub trait UsbTransport {
    type Handle: UsbHandle;

    /// Re-enumerate all attached devices. Invalidates handles obtained from
    /// a previous enumeration.
    fn enumerate(&self) -> Result<Vec<DeviceDesc>, UpdateError>;

    /// Open a native handle to the device described by `desc`.
    fn open(&self, desc: &DeviceDesc) -> Result<Self::Handle, UpdateError>;
}

/// An open device session.
///
/// Dropping the handle releases any claimed interface and closes the device,
/// on every exit path.
pub trait UsbHandle {
    /// Read the device's current configuration value and set it back onto
    /// the device. Some OS USB stacks require this before an interface can
    /// be claimed.
    fn activate_configuration(&mut self) -> Result<(), UpdateError>;

    /// Claim the given interface at alternate setting 0.
    fn claim_interface(&mut self, interface: u8) -> Result<(), UpdateError>;

    /// Select an alternate setting on a claimed interface.
    fn set_alt_setting(
        &mut self,
        interface: u8,
        alt_setting: u8,
    ) -> Result<(), UpdateError>;

    /// Vendor control transfer, device-to-host, device recipient
    /// (bmRequestType 0xC0).
    fn control_in(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        length: u16,
        timeout: Duration,
    ) -> Result<Vec<u8>, UpdateError>;

    /// Bulk write to the given OUT endpoint number. Returns the number of
    /// bytes transferred.
    fn bulk_out(
        &mut self,
        endpoint: u8,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, UpdateError>;

    /// Bus-level device reset.
    fn reset(&mut self) -> Result<(), UpdateError>;
}
