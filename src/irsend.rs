use rfremote_shared::{DeviceLink, IrCode, Transport};

use crate::switch::check_ack;

pub fn transmit<T: Transport>(
    link: &mut DeviceLink<T>,
    device: u32,
    command: u32,
    bits: u32,
) -> anyhow::Result<()> {
    let code = IrCode {
        device,
        command,
        bits,
    };

    check_ack(link.write_infrared(code)?)
}

pub fn receive<T: Transport>(link: &mut DeviceLink<T>) -> anyhow::Result<()> {
    log::info!("Waiting for infrared code");

    let code = link.read_infrared()?;

    println!(
        "Device: {}\tCmd: {:#x}\tBits: {}",
        code.device, code.command, code.bits
    );

    Ok(())
}
