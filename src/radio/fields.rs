//! The logical radio settings model: a desired/applied pair of field
//! values diffed in one pass to drive register read-modify-writes,
//! grounded on `SX127xRadio::_stngs_info_lut` / `set()` / `write_stngs()`.

use super::device::{Device, RadioError};
use super::errata::{self, Bw};
use super::regs;

/// A settable logical radio field (`fld_t` in the original driver).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Field {
    LfMode,
    LoraMode,
    FreqHz,
    OutPwr,
    MaxPwr,
    PaBoost,
    LnaBoostHf,
    LnaGain,
    Dio0,
    Dio1,
    Dio2,
    Dio3,
    Dio4,
    Dio5,
    ImplctHdrMode,
    Cr,
    Bw,
    CrcEn,
    Sf,
    RxTmout,
    PreambleLen,
    AgcOn,
    SyncWord,
}

/// Static per-field register location and bounds, mirroring one row of
/// `_stngs_info_lut[]`. `FreqHz`, `RxTmout` and `PreambleLen` span more
/// than one register and are handled outside this table (see
/// [`Settings::write_stngs`]).
struct FieldInfo {
    /// Only meaningful while the radio is in LoRa mode. Documentary, like
    /// the original `_stngs_info_lut`'s own `lora_mode` column: nothing in
    /// the driver actually branches on it.
    #[allow(dead_code)]
    lora_mode: bool,
    reg: u8,
    bit_start: u8,
    bit_cnt: u8,
    val_min: u32,
    val_max: u32,
    reset_val: u8,
}

const FIELD_TABLE: [FieldInfo; 20] = [
    FieldInfo { lora_mode: false, reg: regs::OPMODE, bit_start: 3, bit_cnt: 1, val_min: 0, val_max: 1, reset_val: 1 }, // LfMode
    FieldInfo { lora_mode: false, reg: regs::OPMODE, bit_start: 7, bit_cnt: 1, val_min: 0, val_max: 1, reset_val: 0 }, // LoraMode
    FieldInfo { lora_mode: false, reg: regs::PA_CFG, bit_start: 0, bit_cnt: 4, val_min: 0, val_max: 15, reset_val: 0x0F }, // OutPwr
    FieldInfo { lora_mode: false, reg: regs::PA_CFG, bit_start: 4, bit_cnt: 3, val_min: 0, val_max: 7, reset_val: 0x04 }, // MaxPwr
    FieldInfo { lora_mode: false, reg: regs::PA_CFG, bit_start: 7, bit_cnt: 1, val_min: 0, val_max: 1, reset_val: 0 }, // PaBoost
    FieldInfo { lora_mode: false, reg: regs::LNA, bit_start: 0, bit_cnt: 2, val_min: 0, val_max: 3, reset_val: 0 }, // LnaBoostHf
    FieldInfo { lora_mode: false, reg: regs::LNA, bit_start: 5, bit_cnt: 3, val_min: 1, val_max: 6, reset_val: 1 }, // LnaGain
    FieldInfo { lora_mode: false, reg: regs::DIOMAP1, bit_start: 6, bit_cnt: 2, val_min: 0, val_max: 2, reset_val: 0 }, // Dio0
    FieldInfo { lora_mode: false, reg: regs::DIOMAP1, bit_start: 4, bit_cnt: 2, val_min: 0, val_max: 2, reset_val: 0 }, // Dio1
    FieldInfo { lora_mode: false, reg: regs::DIOMAP1, bit_start: 2, bit_cnt: 2, val_min: 0, val_max: 2, reset_val: 0 }, // Dio2
    FieldInfo { lora_mode: false, reg: regs::DIOMAP1, bit_start: 0, bit_cnt: 2, val_min: 0, val_max: 2, reset_val: 0 }, // Dio3
    FieldInfo { lora_mode: false, reg: regs::DIOMAP2, bit_start: 6, bit_cnt: 2, val_min: 0, val_max: 2, reset_val: 0 }, // Dio4
    FieldInfo { lora_mode: false, reg: regs::DIOMAP2, bit_start: 4, bit_cnt: 2, val_min: 0, val_max: 2, reset_val: 0 }, // Dio5
    FieldInfo { lora_mode: true, reg: regs::LORA_CFG1, bit_start: 0, bit_cnt: 1, val_min: 0, val_max: 1, reset_val: 0 }, // ImplctHdrMode
    FieldInfo { lora_mode: true, reg: regs::LORA_CFG1, bit_start: 1, bit_cnt: 3, val_min: 1, val_max: 4, reset_val: 1 }, // Cr
    FieldInfo { lora_mode: true, reg: regs::LORA_CFG1, bit_start: 4, bit_cnt: 4, val_min: 0, val_max: 9, reset_val: 7 }, // Bw
    FieldInfo { lora_mode: true, reg: regs::LORA_CFG2, bit_start: 2, bit_cnt: 1, val_min: 0, val_max: 1, reset_val: 0 }, // CrcEn
    FieldInfo { lora_mode: true, reg: regs::LORA_CFG2, bit_start: 4, bit_cnt: 4, val_min: 6, val_max: 12, reset_val: 7 }, // Sf
    FieldInfo { lora_mode: true, reg: regs::LORA_CFG3, bit_start: 2, bit_cnt: 1, val_min: 0, val_max: 1, reset_val: 0 }, // AgcOn
    FieldInfo { lora_mode: true, reg: regs::LORA_SYNC_WORD, bit_start: 0, bit_cnt: 8, val_min: 0, val_max: 255, reset_val: 0x12 }, // SyncWord
];

fn table_index(field: Field) -> Option<usize> {
    Some(match field {
        Field::LfMode => 0,
        Field::LoraMode => 1,
        Field::OutPwr => 2,
        Field::MaxPwr => 3,
        Field::PaBoost => 4,
        Field::LnaBoostHf => 5,
        Field::LnaGain => 6,
        Field::Dio0 => 7,
        Field::Dio1 => 8,
        Field::Dio2 => 9,
        Field::Dio3 => 10,
        Field::Dio4 => 11,
        Field::Dio5 => 12,
        Field::ImplctHdrMode => 13,
        Field::Cr => 14,
        Field::Bw => 15,
        Field::CrcEn => 16,
        Field::Sf => 17,
        Field::AgcOn => 18,
        Field::SyncWord => 19,
        Field::FreqHz | Field::RxTmout | Field::PreambleLen => return None,
    })
}

fn bit_mask(bit_cnt: u8) -> u8 {
    if bit_cnt >= 8 {
        0xFF
    } else {
        (1u8 << bit_cnt) - 1
    }
}

const RX_TMOUT_RESET: u16 = 0x0064;
const PREAMBLE_LEN_RESET: u16 = 0x0008;
const FREQ_RESET: u32 = 0x6C;

/// The logical radio settings model. Values set with [`Settings::set`] are
/// held here until [`Settings::write_stngs`]/[`Settings::write_sleep_stngs`]
/// diffs them against what's already on the silicon and writes only what
/// changed.
pub struct Settings {
    desired: [u8; 20],
    applied: [u8; 20],
    desired_freq: u32,
    applied_freq: u32,
    desired_rx_tmout: u16,
    applied_rx_tmout: u16,
    desired_preamble_len: u16,
    applied_preamble_len: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings {
    /// Settings matching the radio's hardware-reset state.
    pub fn new() -> Self {
        let mut desired = [0u8; 20];
        for (i, info) in FIELD_TABLE.iter().enumerate() {
            desired[i] = info.reset_val;
        }
        Settings {
            desired,
            applied: desired,
            desired_freq: FREQ_RESET,
            applied_freq: FREQ_RESET,
            desired_rx_tmout: RX_TMOUT_RESET,
            applied_rx_tmout: RX_TMOUT_RESET,
            desired_preamble_len: PREAMBLE_LEN_RESET,
            applied_preamble_len: PREAMBLE_LEN_RESET,
        }
    }

    /// Sets a field's desired value. `val` must be within the field's
    /// documented range — this is a caller contract, not a runtime fault,
    /// so it's a `debug_assert!` rather than a returned error.
    pub fn set(&mut self, field: Field, val: u32) {
        match field {
            Field::FreqHz => {
                debug_assert!((regs::FREQ_MIN..=regs::FREQ_MAX).contains(&val));
                self.desired_freq = val;
            }
            Field::RxTmout => {
                debug_assert!(val <= 0x3FF);
                self.desired_rx_tmout = val as u16;
            }
            Field::PreambleLen => {
                debug_assert!(val <= 0xFFFF);
                self.desired_preamble_len = val as u16;
            }
            other => {
                let idx = table_index(other).unwrap();
                let info = &FIELD_TABLE[idx];
                debug_assert!(info.val_min <= val && val <= info.val_max);
                self.desired[idx] = (val as u8) & bit_mask(info.bit_cnt);
            }
        }
    }

    /// True if any outstanding setting requires Sleep mode to apply (only
    /// the LoRa/FSK mode bit does).
    pub fn stngs_require_sleep(&self) -> bool {
        self.desired[1] != self.applied[1] // LoraMode
    }

    /// The last value written to the radio for `field`, used to translate a
    /// DIOx pin event into a logical signal (the pin's meaning depends on
    /// whichever `FLD_RDO_DIOx` mapping is currently on the silicon).
    pub fn applied_value(&self, field: Field) -> u32 {
        match table_index(field) {
            Some(idx) => self.applied[idx] as u32,
            None => match field {
                Field::FreqHz => self.applied_freq,
                Field::RxTmout => self.applied_rx_tmout as u32,
                Field::PreambleLen => self.applied_preamble_len as u32,
                _ => unreachable!(),
            },
        }
    }

    fn lora_mode_desired(&self) -> bool {
        self.desired[1] != 0
    }

    /// Writes every outstanding setting, applying Errata 2.3 when `for_rx`
    /// and the radio is in LoRa mode. The radio must be in Standby.
    pub fn write_stngs<SPI>(
        &mut self,
        dev: &mut Device<SPI>,
        for_rx: bool,
    ) -> Result<(), RadioError<SPI::Error>>
    where
        SPI: embedded_hal::spi::SpiDevice,
    {
        let mut freq = self.desired_freq;
        let mut if_freq2 = 0x20u8; // reset value
        let mut auto_if_on = false;

        if for_rx && self.lora_mode_desired() {
            let bw = self.desired[table_index(Field::Bw).unwrap()];
            let bw = match bw {
                0 => Bw::Bw7K8,
                1 => Bw::Bw10K4,
                2 => Bw::Bw15K6,
                3 => Bw::Bw20K8,
                4 => Bw::Bw31K25,
                5 => Bw::Bw41K7,
                6 => Bw::Bw62K5,
                7 => Bw::Bw125K,
                8 => Bw::Bw250K,
                _ => Bw::Bw500K,
            };
            let adj = errata::adjustment(bw);
            freq += adj.freq_offset_hz;
            if_freq2 = adj.if_freq2;
            auto_if_on = adj.auto_if_on;
        }

        let lora_mode_idx = table_index(Field::LoraMode).unwrap();
        let bw_idx = table_index(Field::Bw).unwrap();
        if self.desired[lora_mode_idx] != self.applied[lora_mode_idx]
            || self.desired[bw_idx] != self.applied[bw_idx]
        {
            dev.write_reg::<{ regs::LORA_IF_FREQ_2 }>(if_freq2)?;
            let mut reg = dev.read_reg::<{ regs::LORA_DTCT_OPTMZ }>()?;
            reg &= !0x80;
            reg |= if auto_if_on { 0x80 } else { 0 };
            dev.write_reg::<{ regs::LORA_DTCT_OPTMZ }>(reg)?;
        }

        if freq != self.applied_freq {
            let buf = [(freq >> 16) as u8, (freq >> 8) as u8, freq as u8];
            dev.write_regs(regs::FREQ_MSB, &buf)?;
            self.applied_freq = freq;
        }

        for idx in 0..FIELD_TABLE.len() {
            if self.desired[idx] != self.applied[idx] {
                let info = &FIELD_TABLE[idx];
                self.rmw_field(dev, info.reg, info.bit_start, info.bit_cnt, self.desired[idx])?;
                self.applied[idx] = self.desired[idx];
            }
        }

        if self.desired_rx_tmout != self.applied_rx_tmout {
            let msb = ((self.desired_rx_tmout >> 8) & 0x3) as u8;
            self.rmw_field(dev, regs::LORA_CFG2, 0, 2, msb)?;
            dev.write_reg::<{ regs::LORA_RX_SYM_TMOUT }>((self.desired_rx_tmout & 0xFF) as u8)?;
            self.applied_rx_tmout = self.desired_rx_tmout;
        }

        if self.desired_preamble_len != self.applied_preamble_len {
            dev.write_reg::<{ regs::LORA_PREAMBLE_LEN }>((self.desired_preamble_len >> 8) as u8)?;
            dev.write_reg::<{ regs::LORA_PREAMBLE_LEN_LSB }>(
                (self.desired_preamble_len & 0xFF) as u8,
            )?;
            self.applied_preamble_len = self.desired_preamble_len;
        }

        Ok(())
    }

    /// Writes the few settings (just the LoRa/FSK mode bit) that require
    /// the radio to already be in Sleep mode.
    pub fn write_sleep_stngs<SPI>(
        &mut self,
        dev: &mut Device<SPI>,
    ) -> Result<(), RadioError<SPI::Error>>
    where
        SPI: embedded_hal::spi::SpiDevice,
    {
        let idx = table_index(Field::LoraMode).unwrap();
        if self.desired[idx] != self.applied[idx] {
            let mut reg = dev.read_reg::<{ regs::OPMODE }>()?;
            if self.desired[idx] != 0 {
                reg |= 0x80;
            } else {
                reg &= !0x80;
            }
            dev.write_reg::<{ regs::OPMODE }>(reg)?;
            self.applied[idx] = self.desired[idx];
        }
        Ok(())
    }

    fn rmw_field<SPI>(
        &self,
        dev: &mut Device<SPI>,
        reg: u8,
        bit_start: u8,
        bit_cnt: u8,
        val: u8,
    ) -> Result<(), RadioError<SPI::Error>>
    where
        SPI: embedded_hal::spi::SpiDevice,
    {
        let mask = bit_mask(bit_cnt) << bit_start;
        let cur = match reg {
            regs::OPMODE => dev.read_reg::<{ regs::OPMODE }>(),
            regs::PA_CFG => dev.read_reg::<{ regs::PA_CFG }>(),
            regs::LNA => dev.read_reg::<{ regs::LNA }>(),
            regs::DIOMAP1 => dev.read_reg::<{ regs::DIOMAP1 }>(),
            regs::DIOMAP2 => dev.read_reg::<{ regs::DIOMAP2 }>(),
            regs::LORA_CFG1 => dev.read_reg::<{ regs::LORA_CFG1 }>(),
            regs::LORA_CFG2 => dev.read_reg::<{ regs::LORA_CFG2 }>(),
            regs::LORA_CFG3 => dev.read_reg::<{ regs::LORA_CFG3 }>(),
            regs::LORA_SYNC_WORD => dev.read_reg::<{ regs::LORA_SYNC_WORD }>(),
            _ => unreachable!("field table references an unhandled register"),
        }?;
        let new = (cur & !mask) | (mask & (val << bit_start));
        match reg {
            regs::OPMODE => dev.write_reg::<{ regs::OPMODE }>(new),
            regs::PA_CFG => dev.write_reg::<{ regs::PA_CFG }>(new),
            regs::LNA => dev.write_reg::<{ regs::LNA }>(new),
            regs::DIOMAP1 => dev.write_reg::<{ regs::DIOMAP1 }>(new),
            regs::DIOMAP2 => dev.write_reg::<{ regs::DIOMAP2 }>(new),
            regs::LORA_CFG1 => dev.write_reg::<{ regs::LORA_CFG1 }>(new),
            regs::LORA_CFG2 => dev.write_reg::<{ regs::LORA_CFG2 }>(new),
            regs::LORA_CFG3 => dev.write_reg::<{ regs::LORA_CFG3 }>(new),
            regs::LORA_SYNC_WORD => dev.write_reg::<{ regs::LORA_SYNC_WORD }>(new),
            _ => unreachable!("field table references an unhandled register"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_settings_match_reset_values() {
        let s = Settings::new();
        assert_eq!(s.desired, s.applied);
        assert_eq!(s.desired_freq, FREQ_RESET);
        assert!(!s.stngs_require_sleep());
    }

    #[test]
    fn setting_lora_mode_requires_sleep_until_applied() {
        let mut s = Settings::new();
        s.set(Field::LoraMode, 1);
        assert!(s.stngs_require_sleep());
    }

    #[test]
    fn setting_bw_does_not_require_sleep() {
        let mut s = Settings::new();
        s.set(Field::Bw, 9);
        assert!(!s.stngs_require_sleep());
    }
}
