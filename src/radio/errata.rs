//! Errata 2.3: "Receiver Spurious Reception of a LoRa Signal" countermeasures.
//!
//! Applying a small frequency offset (and re-tuning the intermediate
//! frequency) when receiving narrowband LoRa suppresses a spurious image
//! the SX127x silicon is prone to detecting as a false preamble. Pure
//! function of the configured bandwidth so it can be tested without a
//! radio attached.

/// LoRa bandwidth setting, `STNG_LORA_BW_*` in the original driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Bw {
    Bw7K8 = 0,
    Bw10K4 = 1,
    Bw15K6 = 2,
    Bw20K8 = 3,
    Bw31K25 = 4,
    Bw41K7 = 5,
    Bw62K5 = 6,
    Bw125K = 7,
    Bw250K = 8,
    Bw500K = 9,
}

impl Bw {
    pub const MIN: u32 = 0;
    pub const MAX: u32 = 9;
}

/// The adjustment to apply before writing the carrier frequency and
/// intermediate-frequency registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adjustment {
    /// Added to the desired carrier frequency before it's written.
    pub freq_offset_hz: u32,
    /// Value for `REG_LORA_IF_FREQ_2` (0x2F).
    pub if_freq2: u8,
    /// Value for the auto-IF-on bit (bit 7) of `REG_LORA_DTCT_OPTMZ` (0x31).
    pub auto_if_on: bool,
}

const TABLE: [(u32, u8); 9] = [
    (7810, 0x48),  // Bw7K8
    (10420, 0x44), // Bw10K4
    (15620, 0x44), // Bw15K6
    (20830, 0x44), // Bw20K8
    (31250, 0x44), // Bw31K25
    (41670, 0x44), // Bw41K7
    (0, 0x40),     // Bw62K5
    (0, 0x40),     // Bw125K
    (0, 0x40),     // Bw250K
];

/// Computes the Errata 2.3 adjustment for `bw`. Only meaningful when
/// receiving in LoRa mode; callers skip this entirely otherwise (see
/// [`crate::radio::fields::Settings::write_stngs`]).
pub fn adjustment(bw: Bw) -> Adjustment {
    if bw == Bw::Bw500K {
        return Adjustment {
            freq_offset_hz: 0,
            if_freq2: 0x20, // reset value; untouched when auto-IF is on
            auto_if_on: true,
        };
    }
    let (freq_offset_hz, if_freq2) = TABLE[bw as usize];
    Adjustment {
        freq_offset_hz,
        if_freq2,
        auto_if_on: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrowband_gets_nonzero_offset_and_rejection_tuning() {
        let adj = adjustment(Bw::Bw7K8);
        assert_eq!(adj.freq_offset_hz, 7810);
        assert_eq!(adj.if_freq2, 0x48);
        assert!(!adj.auto_if_on);
    }

    #[test]
    fn midband_gets_zero_offset_but_still_retuned() {
        let adj = adjustment(Bw::Bw125K);
        assert_eq!(adj.freq_offset_hz, 0);
        assert_eq!(adj.if_freq2, 0x40);
        assert!(!adj.auto_if_on);
    }

    #[test]
    fn wideband_enables_automatic_if() {
        let adj = adjustment(Bw::Bw500K);
        assert_eq!(adj.freq_offset_hz, 0);
        assert!(adj.auto_if_on);
    }
}
