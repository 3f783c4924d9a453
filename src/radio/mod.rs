//! The SX127x register driver: raw SPI access ([`device`]), the logical
//! settings model ([`fields`]), DIO pin decoding ([`dio`]), the Errata 2.3
//! workaround ([`errata`]), and IRQ mask/flag access ([`irq`]).

pub mod device;
pub mod dio;
pub mod errata;
pub mod fields;
pub mod irq;
pub mod regs;

pub use device::{Device, RadioError};
pub use fields::{Field, Settings};

/// Radio operation mode (`op_mode_t` in the original driver). Not part of
/// [`Settings`]: the op mode must be changed before other settings can be
/// applied, so it's written directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OpMode {
    Sleep = 0,
    Stby = 1,
    FsTx = 2,
    Tx = 3,
    FsRx = 4,
    RxCont = 5,
    RxOnce = 6,
    Cad = 7,
}

impl<SPI> Device<SPI>
where
    SPI: embedded_hal::spi::SpiDevice,
{
    /// Reads the current operation mode.
    pub fn read_op_mode(&mut self) -> Result<OpMode, RadioError<SPI::Error>> {
        let reg = self.read_reg::<{ regs::OPMODE }>()? & 0x07;
        Ok(match reg {
            0 => OpMode::Sleep,
            1 => OpMode::Stby,
            2 => OpMode::FsTx,
            3 => OpMode::Tx,
            4 => OpMode::FsRx,
            5 => OpMode::RxCont,
            6 => OpMode::RxOnce,
            _ => OpMode::Cad,
        })
    }

    /// Writes the operation mode immediately, leaving the rest of the
    /// register (LoRa/FSK mode bit, low-frequency bit) untouched.
    pub fn write_op_mode(&mut self, op_mode: OpMode) -> Result<(), RadioError<SPI::Error>> {
        let mut reg = self.read_reg::<{ regs::OPMODE }>()?;
        reg &= !0x07;
        reg |= op_mode as u8 & 0x07;
        self.write_reg::<{ regs::OPMODE }>(reg)
    }

    /// Pin-resets the radio and brings it up in LoRa mode / Standby,
    /// grounded on `SX127xRadio::init_radio`. The reset pulse timing
    /// (1ms low, 6ms high) is the datasheet-documented minimum.
    pub fn init_radio<RST, DELAY>(
        &mut self,
        settings: &mut Settings,
        reset: &mut RST,
        delay: &mut DELAY,
    ) -> Result<(), RadioError<SPI::Error>>
    where
        RST: embedded_hal::digital::OutputPin,
        DELAY: embedded_hal::delay::DelayNs,
    {
        let _ = reset.set_low();
        delay.delay_ms(1);
        let _ = reset.set_high();
        delay.delay_ms(6);

        self.validate_chip()?;

        // The pin reset just reverted the chip to its hardware-reset
        // defaults; `settings`'s own desired/applied arrays must follow
        // suit so a later diff-and-apply doesn't skip a field it thinks
        // is already on the silicon from a previous init.
        *settings = Settings::new();

        self.write_op_mode(OpMode::Sleep)?;
        settings.set(Field::LoraMode, 1);
        settings.write_sleep_stngs(self)?;
        self.write_op_mode(OpMode::Stby)?;
        Ok(())
    }
}
