//! Translation of a DIOx pin edge into the signal it currently represents.
//!
//! Each DIO pin's meaning depends on its 2-bit field in `DIOMAP1`/`DIOMAP2`
//! (see [`crate::radio::fields::Field::Dio0`] etc.) — the same pin can mean
//! `RxDone`, `TxDone` or `CadDone` depending on configuration. The ISR only
//! knows which pin fired; [`translate`] maps `(pin, current mapping value)`
//! to the signal the MAC layer actually cares about.

/// A signal a DIO pin can represent, independent of which physical pin
/// carried it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Signal {
    ModeRdy,
    CadDetected,
    CadDone,
    FhssChgChnl,
    RxTmout,
    RxDone,
    ClkOut,
    PllLock,
    ValidHdr,
    TxDone,
    PayldCrcErr,
}

/// Which physical DIO pin an edge arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pin {
    Dio0,
    Dio1,
    Dio2,
    Dio3,
    Dio4,
    Dio5,
}

use Signal::*;

const DIO0_LUT: [Signal; 3] = [RxDone, TxDone, CadDone];
const DIO1_LUT: [Signal; 3] = [RxTmout, FhssChgChnl, CadDetected];
const DIO2_LUT: [Signal; 3] = [FhssChgChnl, FhssChgChnl, FhssChgChnl];
const DIO3_LUT: [Signal; 3] = [CadDone, ValidHdr, PayldCrcErr];
const DIO4_LUT: [Signal; 3] = [CadDetected, PllLock, PllLock];
const DIO5_LUT: [Signal; 3] = [ModeRdy, ClkOut, ClkOut];

/// Maps `pin`'s currently-applied 2-bit mapping value to the signal it
/// represents. Returns `None` if `mapping_value` is outside the 3 values
/// the pin's lookup table defines (the 4th value the 2-bit field can hold
/// is never assigned a meaning by the silicon for any DIO pin this driver
/// uses).
pub fn translate(pin: Pin, mapping_value: u8) -> Option<Signal> {
    let lut = match pin {
        Pin::Dio0 => &DIO0_LUT,
        Pin::Dio1 => &DIO1_LUT,
        Pin::Dio2 => &DIO2_LUT,
        Pin::Dio3 => &DIO3_LUT,
        Pin::Dio4 => &DIO4_LUT,
        Pin::Dio5 => &DIO5_LUT,
    };
    lut.get(mapping_value as usize).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dio0_mapping() {
        assert_eq!(translate(Pin::Dio0, 0), Some(Signal::RxDone));
        assert_eq!(translate(Pin::Dio0, 1), Some(Signal::TxDone));
        assert_eq!(translate(Pin::Dio0, 2), Some(Signal::CadDone));
        assert_eq!(translate(Pin::Dio0, 3), None);
    }

    #[test]
    fn dio5_mapping_defaults_to_mode_ready() {
        assert_eq!(translate(Pin::Dio5, 0), Some(Signal::ModeRdy));
    }
}
