//! Fuzz target: `decode_command`
//!
//! Drives arbitrary bytes into the MQTT command decoder and asserts that it
//! never panics and that any valve id it yields maps onto the bank's range
//! consistently.
//!
//! cargo fuzz run fuzz_command_decoder

#![no_main]

use agroirriga::app::commands::ValveCommand;
use agroirriga::app::valve::ValveId;
use agroirriga::link::codec::decode_command;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    match decode_command(data) {
        Ok(ValveCommand::Open { valve, .. } | ValveCommand::Close { valve }) => {
            assert_eq!(ValveId::new(valve).is_some(), (1..=10).contains(&valve));
        }
        Ok(ValveCommand::CloseAll) | Err(_) => {}
    }
});
