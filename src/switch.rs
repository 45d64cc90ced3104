use rfremote_shared::{CommandDef, CommandRegistry, DeviceLink, Transport};

pub fn parse_on_off(s: &str) -> Result<bool, String> {
    match s {
        "on" | "1" | "true" => Ok(true),
        "off" | "0" | "false" => Ok(false),
        other => Err(format!("expected on or off, got {:?}", other)),
    }
}

pub fn check_ack(acked: bool) -> anyhow::Result<()> {
    if acked {
        log::info!("Got ok");
        Ok(())
    } else {
        anyhow::bail!("device rejected command")
    }
}

pub fn toggle<T: Transport>(
    link: &mut DeviceLink<T>,
    registry: &CommandRegistry,
    object: &str,
    on: bool,
) -> anyhow::Result<()> {
    log::info!("Switching {} {}", object, if on { "on" } else { "off" });
    check_ack(registry.toggle(link, object, on)?)
}

pub fn send<T: Transport>(
    link: &mut DeviceLink<T>,
    registry: &CommandRegistry,
    id: &str,
) -> anyhow::Result<()> {
    check_ack(registry.send(link, id)?)
}

pub fn list(registry: &CommandRegistry) {
    let tables = registry.tables();

    for (id, def) in &tables.commands {
        let device = tables
            .devices
            .get(id)
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());

        match def {
            CommandDef::Builtin(n) => println!("{}\tdevice {}\tbuiltin {}", id, device, n),
            CommandDef::Pattern(p) => println!("{}\tdevice {}\tpattern {}", id, device, p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_off() {
        assert_eq!(parse_on_off("on"), Ok(true));
        assert_eq!(parse_on_off("0"), Ok(false));
        assert!(parse_on_off("maybe").is_err());
    }

    #[test]
    fn rejected_is_error() {
        assert!(check_ack(true).is_ok());
        assert!(check_ack(false).is_err());
    }
}
