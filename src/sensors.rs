use rfremote_shared::{DeviceLink, Transport};

pub fn command_sensors<T: Transport>(link: &mut DeviceLink<T>) -> anyhow::Result<()> {
    log::info!("Polling sensors");

    let readings = link.read_sensors()?;

    if readings.is_empty() {
        println!("No sensors reported");
    }

    for (name, value) in readings {
        println!("{}: {}", name, value);
    }

    Ok(())
}
