use std::time::Duration;

use log::{debug, info};

use crate::{UpdateDevice, UpdateError, UsbHandle, UsbTransport};

/// Firmware page size, equal to the bulk endpoint's max packet size.
pub const PAGE_SIZE: usize = 64;

/// Bulk OUT endpoint carrying command and data frames.
pub const WRITE_ENDPOINT: u8 = 0x02;

const FRAME_TIMEOUT: Duration = Duration::from_millis(100);

// frame opcodes understood by the bootloader
const OP_STARTAPP: u8 = 0x01;
const OP_WRITEPAGE: u8 = 0x02;

/// Receives upload progress.
///
/// The return value of [`progressed`](ProgressSink::progressed) is reserved
/// for cancellation and currently ignored. [`finished`](ProgressSink::finished)
/// is called exactly once per upload, on the failure path too.
pub trait ProgressSink {
    fn progressed(&mut self, total: f64, now: f64) -> bool;
    fn finished(&mut self);
}

/// Uploads firmware to a device in update mode.
///
/// Holds at most one open device session; [`open`](Flasher::open) must
/// precede [`write_firmware`](Flasher::write_firmware),
/// [`start_device`](Flasher::start_device) and
/// [`reset_device`](Flasher::reset_device).
pub struct Flasher<H: UsbHandle> {
    session: Option<H>,
    progress: Option<Box<dyn ProgressSink>>,
}

impl<H: UsbHandle> Default for Flasher<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: UsbHandle> Flasher<H> {
    pub fn new() -> Self {
        Flasher {
            session: None,
            progress: None,
        }
    }

    pub fn set_progress(&mut self, sink: Box<dyn ProgressSink>) {
        self.progress = Some(sink);
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Open a session to `device` and claim its update interface.
    ///
    /// On failure the session stays closed and any partially opened handle
    /// is released.
    pub fn open<T>(
        &mut self,
        transport: &T,
        device: &UpdateDevice,
    ) -> Result<(), UpdateError>
    where
        T: UsbTransport<Handle = H>,
    {
        self.session = None;
        let mut handle = transport.open(&device.desc())?;
        handle.activate_configuration()?;
        handle.claim_interface(0)?;
        handle.set_alt_setting(0, 0)?;
        self.session = Some(handle);
        Ok(())
    }

    /// Upload `data` page by page.
    ///
    /// Each page is sent as a command frame carrying the page number,
    /// followed by one zero-padded data frame. On a transfer failure the
    /// session is closed before the error propagates, so the caller can
    /// retry from [`open`](Flasher::open).
    pub fn write_firmware(&mut self, data: &[u8]) -> Result<(), UpdateError> {
        if self.session.is_none() {
            return Err(UpdateError::NotOpened);
        }

        let pages = data.len().div_ceil(PAGE_SIZE);
        info!("writing {} bytes in {pages} pages", data.len());

        for page in 0..pages {
            if let Err(err) = self.write_page(data, page) {
                self.session = None;
                self.notify_finished();
                return Err(err);
            }
            if let Some(sink) = self.progress.as_mut() {
                sink.progressed(data.len() as f64, (page * PAGE_SIZE) as f64);
            }
        }
        self.notify_finished();
        Ok(())
    }

    /// Tell the bootloader to jump to the application firmware.
    pub fn start_device(&mut self) -> Result<(), UpdateError> {
        let session = self.session.as_mut().ok_or(UpdateError::NotOpened)?;
        info!("starting application firmware");
        let mut frame = [0u8; PAGE_SIZE];
        frame[0] = OP_STARTAPP;
        session.bulk_out(WRITE_ENDPOINT, &frame, FRAME_TIMEOUT)?;
        Ok(())
    }

    /// Bus-level reset of the device.
    pub fn reset_device(&mut self) -> Result<(), UpdateError> {
        let session = self.session.as_mut().ok_or(UpdateError::NotOpened)?;
        info!("resetting device");
        session.reset()
    }

    /// Release the session. Closing a closed flasher is a state error;
    /// cleanup paths should check [`is_open`](Flasher::is_open) first.
    pub fn close(&mut self) -> Result<(), UpdateError> {
        match self.session.take() {
            Some(_) => Ok(()),
            None => Err(UpdateError::AlreadyClosed),
        }
    }

    fn write_page(
        &mut self,
        data: &[u8],
        page: usize,
    ) -> Result<(), UpdateError> {
        let session = self.session.as_mut().ok_or(UpdateError::NotOpened)?;
        debug!("writing page {page}");
        let command = command_frame(page as u16);
        session.bulk_out(WRITE_ENDPOINT, &command, FRAME_TIMEOUT)?;
        let frame = data_frame(data, page);
        session.bulk_out(WRITE_ENDPOINT, &frame, FRAME_TIMEOUT)?;
        Ok(())
    }

    fn notify_finished(&mut self) {
        if let Some(sink) = self.progress.as_mut() {
            sink.finished();
        }
    }
}

/// WRITEPAGE command frame: opcode, then the page number in little-endian
/// byte order. The byte order is part of the wire format.
fn command_frame(page: u16) -> [u8; PAGE_SIZE] {
    let mut frame = [0u8; PAGE_SIZE];
    frame[0] = OP_WRITEPAGE;
    frame[1] = page as u8;
    frame[2] = (page >> 8) as u8;
    frame
}

/// The up-to-64 payload bytes of `page`, zero-padded to a full frame.
fn data_frame(data: &[u8], page: usize) -> [u8; PAGE_SIZE] {
    let mut frame = [0u8; PAGE_SIZE];
    let start = page * PAGE_SIZE;
    let end = usize::min(start + PAGE_SIZE, data.len());
    frame[..end - start].copy_from_slice(&data[start..end]);
    frame
}
