use usbprog::UpdateTarget;

/// Application firmwares this tool knows how to recognize.
///
/// All USBprog firmwares keep the stock vendor/product pair and are told
/// apart by their bcdDevice release code; the AVRISP mk2 clone firmware
/// enumerates with Atmel's own identity.
pub(crate) fn builtin_targets() -> Vec<UpdateTarget> {
    vec![
        UpdateTarget::new("usbprogrs", "usbprogRS", 0x1781, 0x0c62, 0x0001),
        UpdateTarget::new("blinkdemo", "Blink demo", 0x1781, 0x0c62, 0x0002),
        UpdateTarget::new("simpleport", "SimplePort", 0x1781, 0x0c62, 0x0003),
        UpdateTarget::new("jtagice2", "JTAG ICE mk2 clone", 0x1781, 0x0c62, 0x0004),
        UpdateTarget::new("openocd", "OpenOCD debugger", 0x1781, 0x0c63, 0x0100),
        UpdateTarget::new("avrispmk2", "AVRISP mk2 clone", 0x03eb, 0x2104, 0x0200),
    ]
}
