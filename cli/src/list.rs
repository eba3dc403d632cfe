use usbprog::{DeviceDiscovery, NusbTransport};

use crate::CliError;
use crate::targets::builtin_targets;

pub(crate) fn list_devices(
    vendor: Option<u16>,
    product: Option<u16>,
) -> Result<(), CliError> {
    let transport = NusbTransport::new();
    let mut discovery = DeviceDiscovery::new();
    discovery.discover(&transport, &builtin_targets())?;

    let current = discovery.current_update_device().cloned();
    let mut shown = 0;
    for (number, device) in discovery.devices().iter().enumerate() {
        if vendor.is_some_and(|id| device.vendor_id() != id)
            || product.is_some_and(|id| device.product_id() != id)
        {
            continue;
        }
        println!(
            " [{number}] {} {device}",
            if current.as_ref() == Some(device) { "*" } else { " " },
        );
        shown += 1;
    }
    if shown == 0 {
        println!("No programmable device found");
    }
    Ok(())
}
