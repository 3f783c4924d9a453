//! LoRa-mode IRQ mask/flags register access (`RegIrqFlagsMask`/`RegIrqFlags`).

use bitflags::bitflags;

use super::device::{Device, RadioError};
use super::regs;

bitflags! {
    /// Bits of `REG_LORA_IRQ_MASK` (0x11) / `REG_LORA_IRQ_FLAGS` (0x12).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct IrqFlags: u8 {
        const CAD_DETECTED   = 0x01;
        const FHSS_CHG_CHNL  = 0x02;
        const CAD_DONE       = 0x04;
        const TX_DONE        = 0x08;
        const VALID_HDR      = 0x10;
        const CRC_ERR        = 0x20;
        const RX_DONE        = 0x40;
        const RX_TMOUT       = 0x80;
    }
}

impl<SPI> Device<SPI>
where
    SPI: embedded_hal::spi::SpiDevice,
{
    /// Reads/modifies/writes the IRQ mask register. Setting a bit masks
    /// (disables) that IRQ; clearing it enables the IRQ. Bits not named in
    /// either set are left as they were.
    pub fn write_lora_irq_mask(
        &mut self,
        disable_these: IrqFlags,
        enable_these: IrqFlags,
    ) -> Result<(), RadioError<SPI::Error>> {
        let mut reg = self.read_reg::<{ regs::LORA_IRQ_MASK }>()?;
        reg |= disable_these.bits();
        reg &= !enable_these.bits();
        self.write_reg::<{ regs::LORA_IRQ_MASK }>(reg)
    }

    /// Acknowledges (clears) the named IRQ flags. Writing a 1 to a flag bit
    /// clears it; this is a plain write, not a read-modify-write.
    pub fn write_lora_irq_flags(
        &mut self,
        clear_these: IrqFlags,
    ) -> Result<(), RadioError<SPI::Error>> {
        self.write_reg::<{ regs::LORA_IRQ_FLAGS }>(clear_these.bits())
    }
}
