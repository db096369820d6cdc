//! Locating and opening the widget with rusb
//!
//! Thin sequential harness around the transfer core: enumerate devices, take
//! the first vendor/product match, open it, detach any active kernel driver,
//! and claim the communication interface.

use crate::config::DeviceSettings;
use crate::error::DeviceError;
use crate::usb::transfers::{DeviceIo, TransferStatus, map_transfer_status};
use rusb::{Context, Device, DeviceHandle, UsbContext};
use std::time::Duration;
use tracing::{debug, info, warn};

/// An open, claimed widget handle bound to its bulk endpoints
pub struct UsbDeviceIo {
    handle: DeviceHandle<Context>,
    out_endpoint: u8,
    in_endpoint: u8,
}

impl UsbDeviceIo {
    /// Find, open, and claim the first device matching the settings
    pub fn open(context: &Context, settings: &DeviceSettings) -> Result<Self, DeviceError> {
        let device = find_device(context, settings.vendor_id, settings.product_id)?;
        info!(
            "opening device {:04x}:{:04x} on bus {:03} address {:03}",
            settings.vendor_id,
            settings.product_id,
            device.bus_number(),
            device.address()
        );

        let handle = device.open().map_err(DeviceError::Open)?;

        match handle.kernel_driver_active(settings.interface) {
            Ok(true) => {
                debug!(
                    "detaching kernel driver from interface {}",
                    settings.interface
                );
                if let Err(e) = handle.detach_kernel_driver(settings.interface) {
                    warn!("failed to detach kernel driver: {}", e);
                }
            }
            Ok(false) => {}
            Err(e) => {
                debug!("could not check kernel driver status: {}", e);
            }
        }

        handle
            .claim_interface(settings.interface)
            .map_err(|source| DeviceError::ClaimInterface {
                interface: settings.interface,
                source,
            })?;
        debug!("claimed interface {}", settings.interface);

        Ok(Self {
            handle,
            out_endpoint: settings.out_endpoint,
            in_endpoint: settings.in_endpoint,
        })
    }
}

impl DeviceIo for UsbDeviceIo {
    fn write_bulk(&self, data: &[u8], timeout: Duration) -> Result<usize, TransferStatus> {
        self.handle
            .write_bulk(self.out_endpoint, data, timeout)
            .map_err(map_transfer_status)
    }

    fn read_bulk(&self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransferStatus> {
        self.handle
            .read_bulk(self.in_endpoint, buf, timeout)
            .map_err(map_transfer_status)
    }
}

/// First device whose descriptor matches the vendor and product IDs
fn find_device(
    context: &Context,
    vendor_id: u16,
    product_id: u16,
) -> Result<Device<Context>, DeviceError> {
    let devices = context.devices().map_err(DeviceError::Enumerate)?;

    for device in devices.iter() {
        let descriptor = match device.device_descriptor() {
            Ok(d) => d,
            Err(e) => {
                debug!("skipping unreadable device descriptor: {}", e);
                continue;
            }
        };
        if descriptor.vendor_id() == vendor_id && descriptor.product_id() == product_id {
            return Ok(device);
        }
    }

    Err(DeviceError::NotFound {
        vendor_id,
        product_id,
    })
}
