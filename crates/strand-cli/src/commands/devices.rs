//! Output device listing.

use strand_io::list_devices;

pub fn run() -> anyhow::Result<()> {
    let devices = list_devices()?;
    if devices.is_empty() {
        println!("No output devices found.");
        return Ok(());
    }

    println!("Output Devices:");
    for (idx, device) in devices.iter().enumerate() {
        let marker = if device.is_default { " (default)" } else { "" };
        println!(
            "  [{}] {} ({} Hz, {} ch){}",
            idx, device.name, device.default_sample_rate, device.default_channels, marker
        );
    }
    println!();
    println!("Tip: pass an index or partial name with --device:");
    println!("  strand play --device 0 --freq 220,330");
    Ok(())
}
