//! isp-sim - run a full programming session against the simulated target.
//!
//! The simulated device only follows a slow SCK, so the handshake has to
//! walk down the speed ladder before anything else happens. Run with
//! `RUST_LOG=debug` to watch the fallback.
//!
//! ```sh
//! cargo run --bin isp-sim --features demo
//! ```

use anyhow::{ensure, Context, Result};
use avr_isp::hal::{MockClock, SimulatedTarget};
use avr_isp::{BlockFlags, FlashBlockWriter, IspConfig, IspSession, SckSpeed};

/// Page size of the simulated device in bytes (128 words).
const PAGE_SIZE: u16 = 256;

/// Bytes per host block, as a USB control transfer would carry them.
const BLOCK_SIZE: usize = 200;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let clock = MockClock::new();
    let target = SimulatedTarget::new(clock.clone()).with_min_sck_period_cycles(5_000);

    let config = IspConfig::default().with_speed(SckSpeed::Auto);
    let mut session = IspSession::connect(target, clock, config);

    session
        .enter_programming_mode(false)
        .context("target did not enter programming mode")?;
    log::info!("programming mode entered at {:?}", session.speed());

    let signature = session.read_signature();
    log::info!(
        "signature {:02X} {:02X} {:02X}",
        signature[0],
        signature[1],
        signature[2]
    );

    session.chip_erase()?;

    // Spans the extended address boundary at 0x20000.
    let base = 0x1_FF00;
    let image: Vec<u8> = (0..600u32).map(|i| (i * 7 + 3) as u8).collect();

    let mut writer = FlashBlockWriter::new(base, PAGE_SIZE);
    let blocks = image.chunks(BLOCK_SIZE).count();
    for (index, chunk) in image.chunks(BLOCK_SIZE).enumerate() {
        let flags = BlockFlags {
            first: index == 0,
            last: index + 1 == blocks,
        };
        session
            .write_flash_block(&mut writer, chunk, flags)
            .with_context(|| format!("flash block {} failed", index))?;
    }
    log::info!("wrote {} flash bytes at 0x{:05X}", image.len(), base);

    let mut readback = vec![0u8; image.len()];
    session.read_flash_block(base, &mut readback);
    ensure!(readback == image, "flash verify failed");
    log::info!("flash verified");

    let settings = b"isp-sim";
    session.write_eeprom_block(0x0010, settings)?;
    let mut eeprom = [0u8; 7];
    session.read_eeprom_block(0x0010, &mut eeprom);
    ensure!(&eeprom == settings, "eeprom verify failed");
    log::info!("eeprom verified");

    session.disconnect();
    Ok(())
}
