use crate::DeviceDesc;

/// USB identity of the USBprog bootloader.
pub const UPDATE_VENDOR_ID: u16 = 0x1781;
pub const UPDATE_PRODUCT_ID: u16 = 0x0c62;
pub const UPDATE_BCD_DEVICE: u16 = 0x0000;

const UPDATE_MODE_NAME: &str = "USBprog in update mode";
const UPDATE_MODE_SHORT_NAME: &str = "usbprog";

/// Catalog value meaning "field not specified".
pub const TARGET_UNSET: u16 = 0xffff;

/// One attached USB device recognized as a flashable target.
///
/// Records are rebuilt from scratch on every discovery pass; callers refer
/// to them by index into the current list, never by a reference kept across
/// a rediscovery.
#[derive(Clone, Debug)]
pub struct UpdateDevice {
    bus_id: String,
    address: u8,
    vendor_id: u16,
    product_id: u16,
    bcd_device: u16,
    update_mode: bool,
    name: String,
    short_name: String,
}

impl UpdateDevice {
    pub(crate) fn in_update_mode(desc: &DeviceDesc) -> Self {
        Self::new(desc, true, UPDATE_MODE_NAME, UPDATE_MODE_SHORT_NAME)
    }

    pub(crate) fn with_target(desc: &DeviceDesc, target: &UpdateTarget) -> Self {
        Self::new(desc, false, target.label(), target.name())
    }

    fn new(
        desc: &DeviceDesc,
        update_mode: bool,
        name: &str,
        short_name: &str,
    ) -> Self {
        UpdateDevice {
            bus_id: desc.bus_id.clone(),
            address: desc.address,
            vendor_id: desc.vendor_id,
            product_id: desc.product_id,
            bcd_device: desc.bcd_device,
            update_mode,
            name: name.to_string(),
            short_name: short_name.to_string(),
        }
    }

    pub fn bus_id(&self) -> &str {
        &self.bus_id
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    pub fn product_id(&self) -> u16 {
        self.product_id
    }

    pub fn bcd_device(&self) -> u16 {
        self.bcd_device
    }

    /// True if the device is running the bootloader and accepts page writes.
    pub fn update_mode(&self) -> bool {
        self.update_mode
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    pub(crate) fn desc(&self) -> DeviceDesc {
        DeviceDesc {
            bus_id: self.bus_id.clone(),
            address: self.address,
            vendor_id: self.vendor_id,
            product_id: self.product_id,
            bcd_device: self.bcd_device,
        }
    }
}

/// Same physical device: bus, address and USB ids all match. Names and the
/// update-mode flag are display state, not identity.
impl PartialEq for UpdateDevice {
    fn eq(&self, other: &Self) -> bool {
        self.bus_id == other.bus_id
            && self.address == other.address
            && self.vendor_id == other.vendor_id
            && self.product_id == other.product_id
    }
}

impl Eq for UpdateDevice {}

impl std::fmt::Display for UpdateDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Bus {} Device {:03}: ID {:04x}:{:04x} {}",
            self.bus_id, self.address, self.vendor_id, self.product_id, self.name
        )
    }
}

/// A known application firmware's USB identity, used to recognize devices
/// that are flashable but currently running application code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateTarget {
    name: String,
    label: String,
    vendor_id: u16,
    product_id: u16,
    bcd_device: u16,
}

impl UpdateTarget {
    pub fn new(
        name: &str,
        label: &str,
        vendor_id: u16,
        product_id: u16,
        bcd_device: u16,
    ) -> Self {
        UpdateTarget {
            name: name.to_string(),
            label: label.to_string(),
            vendor_id,
            product_id,
            bcd_device,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    pub fn product_id(&self) -> u16 {
        self.product_id
    }

    pub fn bcd_device(&self) -> u16 {
        self.bcd_device
    }

    /// A target with any unspecified numeric field never matches anything.
    pub fn is_valid(&self) -> bool {
        self.vendor_id != TARGET_UNSET
            && self.product_id != TARGET_UNSET
            && self.bcd_device != TARGET_UNSET
    }

    pub fn matches(&self, desc: &DeviceDesc) -> bool {
        self.is_valid()
            && self.vendor_id == desc.vendor_id
            && self.product_id == desc.product_id
            && self.bcd_device == desc.bcd_device
    }
}
