//! Scripted fakes for the transport traits, shared by the unit tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::{DeviceDesc, UpdateError, UsbHandle, UsbTransport};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Op {
    ActivateConfiguration,
    ClaimInterface(u8),
    SetAltSetting(u8, u8),
    ControlIn {
        request: u8,
        value: u16,
        index: u16,
        length: u16,
        timeout_ms: u64,
    },
    BulkOut {
        endpoint: u8,
        data: Vec<u8>,
        timeout_ms: u64,
    },
    Reset,
    Closed,
}

#[derive(Default)]
struct Script {
    ops: RefCell<Vec<Op>>,
    fail_enumerate: Cell<bool>,
    fail_claim: Cell<bool>,
    // number of control_in calls that fail before one succeeds
    failing_control_attempts: Cell<usize>,
    // index of the bulk_out call that fails, counted from zero
    failing_bulk_call: Cell<Option<usize>>,
    bulk_calls: Cell<usize>,
}

/// In-memory [`UsbTransport`] with a scripted device list and failure
/// injection, recording every handle operation.
pub(crate) struct FakeTransport {
    devices: RefCell<Vec<DeviceDesc>>,
    script: Rc<Script>,
}

impl FakeTransport {
    pub(crate) fn new(devices: Vec<DeviceDesc>) -> Self {
        FakeTransport {
            devices: RefCell::new(devices),
            script: Rc::new(Script::default()),
        }
    }

    pub(crate) fn set_devices(&self, devices: Vec<DeviceDesc>) {
        *self.devices.borrow_mut() = devices;
    }

    pub(crate) fn fail_enumerate(&self) {
        self.script.fail_enumerate.set(true);
    }

    pub(crate) fn fail_claim(&self) {
        self.script.fail_claim.set(true);
    }

    pub(crate) fn fail_control_attempts(&self, attempts: usize) {
        self.script.failing_control_attempts.set(attempts);
    }

    pub(crate) fn fail_bulk_call(&self, call: usize) {
        self.script.failing_bulk_call.set(Some(call));
    }

    pub(crate) fn ops(&self) -> Vec<Op> {
        self.script.ops.borrow().clone()
    }

    pub(crate) fn bulk_frames(&self) -> Vec<Vec<u8>> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                Op::BulkOut { data, .. } => Some(data),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn control_attempts(&self) -> usize {
        self.ops()
            .iter()
            .filter(|op| matches!(op, Op::ControlIn { .. }))
            .count()
    }
}

impl UsbTransport for FakeTransport {
    type Handle = FakeHandle;

    fn enumerate(&self) -> Result<Vec<DeviceDesc>, UpdateError> {
        if self.script.fail_enumerate.get() {
            return Err(UpdateError::Io("enumeration failed".into()));
        }
        Ok(self.devices.borrow().clone())
    }

    fn open(&self, _desc: &DeviceDesc) -> Result<FakeHandle, UpdateError> {
        Ok(FakeHandle {
            script: Rc::clone(&self.script),
        })
    }
}

pub(crate) struct FakeHandle {
    script: Rc<Script>,
}

impl FakeHandle {
    fn record(&self, op: Op) {
        self.script.ops.borrow_mut().push(op);
    }
}

impl UsbHandle for FakeHandle {
    fn activate_configuration(&mut self) -> Result<(), UpdateError> {
        self.record(Op::ActivateConfiguration);
        Ok(())
    }

    fn claim_interface(&mut self, interface: u8) -> Result<(), UpdateError> {
        if self.script.fail_claim.get() {
            return Err(UpdateError::Io("claim failed".into()));
        }
        self.record(Op::ClaimInterface(interface));
        Ok(())
    }

    fn set_alt_setting(
        &mut self,
        interface: u8,
        alt_setting: u8,
    ) -> Result<(), UpdateError> {
        self.record(Op::SetAltSetting(interface, alt_setting));
        Ok(())
    }

    fn control_in(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        length: u16,
        timeout: Duration,
    ) -> Result<Vec<u8>, UpdateError> {
        self.record(Op::ControlIn {
            request,
            value,
            index,
            length,
            timeout_ms: timeout.as_millis() as u64,
        });
        let failing = self.script.failing_control_attempts.get();
        if failing > 0 {
            self.script.failing_control_attempts.set(failing - 1);
            return Err(UpdateError::Io("control transfer failed".into()));
        }
        Ok(vec![0; length as usize])
    }

    fn bulk_out(
        &mut self,
        endpoint: u8,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, UpdateError> {
        let call = self.script.bulk_calls.get();
        self.script.bulk_calls.set(call + 1);
        if self.script.failing_bulk_call.get() == Some(call) {
            return Err(UpdateError::Io("bulk transfer failed".into()));
        }
        self.record(Op::BulkOut {
            endpoint,
            data: data.to_vec(),
            timeout_ms: timeout.as_millis() as u64,
        });
        Ok(data.len())
    }

    fn reset(&mut self) -> Result<(), UpdateError> {
        self.record(Op::Reset);
        Ok(())
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.record(Op::Closed);
    }
}
