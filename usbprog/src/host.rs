use std::time::Duration;

use nusb::{
    MaybeFuture,
    transfer::{Buffer, Bulk, ControlIn, ControlType, Out, Recipient},
};

use crate::{DeviceDesc, UpdateError, UsbHandle, UsbTransport};

/// [`UsbTransport`] backed by [`nusb`].
///
/// All calls are blocking; timeouts are per transfer.
#[derive(Default)]
pub struct NusbTransport;

impl NusbTransport {
    pub fn new() -> Self {
        NusbTransport
    }

    fn device_info(
        &self,
        desc: &DeviceDesc,
    ) -> Result<nusb::DeviceInfo, UpdateError> {
        nusb::list_devices()
            .wait()?
            .find(|dev| {
                dev.bus_id() == desc.bus_id
                    && dev.device_address() == desc.address
                    && dev.vendor_id() == desc.vendor_id
                    && dev.product_id() == desc.product_id
            })
            .ok_or_else(|| {
                UpdateError::Io(format!(
                    "device {:04x}:{:04x} on bus {} (address {}) is gone",
                    desc.vendor_id, desc.product_id, desc.bus_id, desc.address
                ))
            })
    }
}

impl UsbTransport for NusbTransport {
    type Handle = NusbHandle;

    fn enumerate(&self) -> Result<Vec<DeviceDesc>, UpdateError> {
        Ok(nusb::list_devices()
            .wait()?
            .map(|dev| DeviceDesc {
                bus_id: dev.bus_id().to_string(),
                address: dev.device_address(),
                vendor_id: dev.vendor_id(),
                product_id: dev.product_id(),
                bcd_device: dev.device_version(),
            })
            .collect())
    }

    fn open(&self, desc: &DeviceDesc) -> Result<NusbHandle, UpdateError> {
        let device = self.device_info(desc)?.open().wait()?;
        Ok(NusbHandle {
            device,
            interface: None,
        })
    }
}

/// An open [`nusb::Device`] plus the claimed interface, if any.
///
/// The interface claim is released when the handle is dropped.
pub struct NusbHandle {
    device: nusb::Device,
    interface: Option<nusb::Interface>,
}

impl NusbHandle {
    fn interface(&self) -> Result<&nusb::Interface, UpdateError> {
        self.interface
            .as_ref()
            .ok_or_else(|| UpdateError::Io("no claimed interface".into()))
    }
}

impl UsbHandle for NusbHandle {
    fn activate_configuration(&mut self) -> Result<(), UpdateError> {
        let config = self
            .device
            .active_configuration()
            .map_err(|err| UpdateError::Io(err.to_string()))?
            .configuration_value();
        self.device.set_configuration(config).wait()?;
        Ok(())
    }

    fn claim_interface(&mut self, interface: u8) -> Result<(), UpdateError> {
        self.interface = Some(self.device.claim_interface(interface).wait()?);
        Ok(())
    }

    fn set_alt_setting(
        &mut self,
        _interface: u8,
        alt_setting: u8,
    ) -> Result<(), UpdateError> {
        Ok(self.interface()?.set_alt_setting(alt_setting).wait()?)
    }

    fn control_in(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        length: u16,
        timeout: Duration,
    ) -> Result<Vec<u8>, UpdateError> {
        Ok(self
            .interface()?
            .control_in(
                ControlIn {
                    control_type: ControlType::Vendor,
                    recipient: Recipient::Device,
                    request,
                    value,
                    index,
                    length,
                },
                timeout,
            )
            .wait()?)
    }

    fn bulk_out(
        &mut self,
        endpoint: u8,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, UpdateError> {
        let mut out_ep: nusb::Endpoint<Bulk, Out> = self
            .interface()?
            .endpoint(endpoint)
            .map_err(|err| UpdateError::Io(err.to_string()))?;

        let mut buf = Buffer::new(data.len());
        buf.extend_from_slice(data);
        out_ep.submit(buf);

        let completion = out_ep.wait_next_complete(timeout).ok_or_else(|| {
            UpdateError::Io(format!(
                "bulk write to endpoint {endpoint:#04x} timed out"
            ))
        })?;
        completion.status?;
        Ok(data.len())
    }

    fn reset(&mut self) -> Result<(), UpdateError> {
        Ok(self.device.reset().wait()?)
    }
}
