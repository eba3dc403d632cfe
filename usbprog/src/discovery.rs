use log::debug;

use crate::{
    UPDATE_BCD_DEVICE, UPDATE_PRODUCT_ID, UPDATE_VENDOR_ID, UpdateDevice,
    UpdateError, UpdateTarget, UsbTransport,
    transport::DeviceDesc,
};

/// Scans the bus for flashable devices and tracks which one is the current
/// update target.
///
/// Every [`discover`](DeviceDiscovery::discover) pass rebuilds the device
/// list from scratch; indices handed out before a pass are only meaningful
/// afterwards if the list did not change.
#[derive(Default)]
pub struct DeviceDiscovery {
    devices: Vec<UpdateDevice>,
    current: Option<usize>,
}

fn is_bootloader(desc: &DeviceDesc) -> bool {
    desc.vendor_id == UPDATE_VENDOR_ID
        && desc.product_id == UPDATE_PRODUCT_ID
        && desc.bcd_device == UPDATE_BCD_DEVICE
}

impl DeviceDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the device list from a fresh enumeration.
    ///
    /// Devices matching the bootloader signature become update-mode records;
    /// devices matching the first valid entry of `targets` become
    /// application-mode records; everything else is dropped silently. If the
    /// resulting list differs from the previous one, the current selection
    /// is cleared. On enumeration failure the previous list stays in place.
    pub fn discover<T: UsbTransport>(
        &mut self,
        transport: &T,
        targets: &[UpdateTarget],
    ) -> Result<(), UpdateError> {
        let descs = transport.enumerate()?;

        let mut devices = Vec::new();
        for desc in &descs {
            if is_bootloader(desc) {
                debug!(
                    "found bootloader at bus {} address {}",
                    desc.bus_id, desc.address
                );
                devices.push(UpdateDevice::in_update_mode(desc));
            } else if let Some(target) =
                targets.iter().find(|t| t.matches(desc))
            {
                debug!(
                    "found {} ({:04x}:{:04x}) at bus {} address {}",
                    target.name(),
                    desc.vendor_id,
                    desc.product_id,
                    desc.bus_id,
                    desc.address
                );
                devices.push(UpdateDevice::with_target(desc, target));
            }
        }

        if devices != self.devices {
            self.current = None;
        }
        self.devices = devices;
        Ok(())
    }

    /// All devices found by the last discovery pass.
    pub fn devices(&self) -> &[UpdateDevice] {
        &self.devices
    }

    /// Device by list index, for callers addressing devices by number.
    pub fn device(&self, number: usize) -> Result<&UpdateDevice, UpdateError> {
        self.devices
            .get(number)
            .ok_or(UpdateError::NoSuchDevice(number))
    }

    /// The device a firmware update would be written to.
    ///
    /// With no explicit selection, the first device in update mode wins;
    /// zero or several update-mode devices is not an error.
    pub fn current_update_device(&self) -> Option<&UpdateDevice> {
        match self.current {
            Some(index) => self.devices.get(index),
            None => self.devices.iter().find(|dev| dev.update_mode()),
        }
    }

    /// Explicitly selected index, if any.
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Select the update target by index. Out-of-range requests leave the
    /// selection unchanged.
    pub fn set_current(&mut self, index: usize) {
        if index < self.devices.len() {
            self.current = Some(index);
        }
    }

    /// Drop the explicit selection, falling back to auto-select.
    pub fn clear_current(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTransport;

    fn bootloader_desc(address: u8) -> DeviceDesc {
        DeviceDesc {
            bus_id: "001".into(),
            address,
            vendor_id: UPDATE_VENDOR_ID,
            product_id: UPDATE_PRODUCT_ID,
            bcd_device: UPDATE_BCD_DEVICE,
        }
    }

    fn app_desc(address: u8) -> DeviceDesc {
        DeviceDesc {
            bus_id: "001".into(),
            address,
            vendor_id: UPDATE_VENDOR_ID,
            product_id: UPDATE_PRODUCT_ID,
            bcd_device: 0x0001,
        }
    }

    fn targets() -> Vec<UpdateTarget> {
        vec![
            UpdateTarget::new("blink", "Blink demo", UPDATE_VENDOR_ID, UPDATE_PRODUCT_ID, 0x0001),
            UpdateTarget::new("avrisp", "AVRISP mk2 clone", 0x03eb, 0x2104, 0x0200),
        ]
    }

    #[test]
    fn test_classification() {
        let transport = FakeTransport::new(vec![
            bootloader_desc(2),
            app_desc(3),
            // unrelated device, must be excluded
            DeviceDesc {
                bus_id: "002".into(),
                address: 1,
                vendor_id: 0x046d,
                product_id: 0xc077,
                bcd_device: 0x7200,
            },
        ]);

        let mut discovery = DeviceDiscovery::new();
        discovery.discover(&transport, &targets()).unwrap();

        let devices = discovery.devices();
        assert_eq!(devices.len(), 2);
        assert!(devices[0].update_mode());
        assert_eq!(devices[0].short_name(), "usbprog");
        assert!(!devices[1].update_mode());
        assert_eq!(devices[1].short_name(), "blink");
        assert_eq!(devices[1].name(), "Blink demo");
    }

    #[test]
    fn test_bootloader_signature_wins_over_catalog() {
        // a catalog entry claiming the bootloader's exact identity
        let shadow = vec![UpdateTarget::new(
            "shadow",
            "Shadow",
            UPDATE_VENDOR_ID,
            UPDATE_PRODUCT_ID,
            UPDATE_BCD_DEVICE,
        )];
        let transport = FakeTransport::new(vec![bootloader_desc(2)]);

        let mut discovery = DeviceDiscovery::new();
        discovery.discover(&transport, &shadow).unwrap();

        assert!(discovery.devices()[0].update_mode());
        assert_eq!(discovery.devices()[0].short_name(), "usbprog");
    }

    #[test]
    fn test_selection_resets_on_list_change() {
        let transport = FakeTransport::new(vec![bootloader_desc(2), app_desc(3)]);
        let mut discovery = DeviceDiscovery::new();
        discovery.discover(&transport, &targets()).unwrap();
        discovery.set_current(1);
        assert_eq!(discovery.current_index(), Some(1));

        // same list again: selection survives
        discovery.discover(&transport, &targets()).unwrap();
        assert_eq!(discovery.current_index(), Some(1));

        // device unplugged: selection resets
        transport.set_devices(vec![bootloader_desc(2)]);
        discovery.discover(&transport, &targets()).unwrap();
        assert_eq!(discovery.current_index(), None);
    }

    #[test]
    fn test_out_of_range_selection_is_a_noop() {
        let transport = FakeTransport::new(vec![bootloader_desc(2)]);
        let mut discovery = DeviceDiscovery::new();
        discovery.discover(&transport, &targets()).unwrap();

        discovery.set_current(0);
        discovery.set_current(7);
        assert_eq!(discovery.current_index(), Some(0));
    }

    #[test]
    fn test_auto_select_prefers_first_update_mode() {
        let transport =
            FakeTransport::new(vec![app_desc(3), bootloader_desc(4), bootloader_desc(5)]);
        let mut discovery = DeviceDiscovery::new();
        discovery.discover(&transport, &targets()).unwrap();

        let current = discovery.current_update_device().unwrap();
        assert!(current.update_mode());
        assert_eq!(current.address(), 4);

        // no update-mode device at all
        transport.set_devices(vec![app_desc(3)]);
        discovery.discover(&transport, &targets()).unwrap();
        assert!(discovery.current_update_device().is_none());
    }

    #[test]
    fn test_enumeration_failure_keeps_old_list() {
        let transport = FakeTransport::new(vec![bootloader_desc(2)]);
        let mut discovery = DeviceDiscovery::new();
        discovery.discover(&transport, &targets()).unwrap();
        discovery.set_current(0);

        transport.fail_enumerate();
        assert!(matches!(
            discovery.discover(&transport, &targets()),
            Err(UpdateError::Io(_))
        ));
        assert_eq!(discovery.devices().len(), 1);
        assert_eq!(discovery.current_index(), Some(0));
    }

    #[test]
    fn test_device_by_number() {
        let transport = FakeTransport::new(vec![bootloader_desc(2)]);
        let mut discovery = DeviceDiscovery::new();
        discovery.discover(&transport, &targets()).unwrap();

        assert!(discovery.device(0).is_ok());
        assert!(matches!(
            discovery.device(1),
            Err(UpdateError::NoSuchDevice(1))
        ));
    }
}
