//! Raw SX127x register/FIFO access over SPI.
//!
//! Registers are addressed with a single byte: bit 7 clear selects a read,
//! set selects a write, the low 7 bits are the address (see
//! `SX127xRadio::_read`/`_write` in the original driver). [`RawReg`] encodes
//! that addressing scheme once, generically, by overriding
//! [`regiface::ReadableRegister::readable_id`]/[`regiface::WritableRegister::writeable_id`]
//! so every single-byte register reuses `regiface::spi::blocking`/`r#async`
//! instead of a bespoke per-register SPI framing layer.

use core::convert::Infallible;

use regiface::errors::{ReadRegisterError, WriteRegisterError};
use regiface::{FromByteArray, ReadableRegister, Register, ToByteArray, WritableRegister};

use super::regs;

const SPI_WRITE_BIT: u8 = 0x80;
const SPI_READ_MASK: u8 = !SPI_WRITE_BIT;

/// A single-byte register at address `ADDR`, read with bit 7 clear and
/// written with bit 7 set.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawReg<const ADDR: u8>(pub u8);

impl<const ADDR: u8> Register for RawReg<ADDR> {
    type IdType = u8;
    fn id() -> u8 {
        ADDR
    }
}

impl<const ADDR: u8> ReadableRegister for RawReg<ADDR> {
    fn readable_id() -> u8 {
        ADDR & SPI_READ_MASK
    }
}

impl<const ADDR: u8> WritableRegister for RawReg<ADDR> {
    fn writeable_id() -> u8 {
        ADDR | SPI_WRITE_BIT
    }
}

impl<const ADDR: u8> FromByteArray for RawReg<ADDR> {
    type Error = Infallible;
    type Array = [u8; 1];
    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(RawReg(bytes[0]))
    }
}

impl<const ADDR: u8> ToByteArray for RawReg<ADDR> {
    type Error = Infallible;
    type Array = [u8; 1];
    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.0])
    }
}

/// Errors that can occur talking to the radio over SPI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioError<E> {
    /// The SPI bus transaction itself failed.
    Bus(E),
    /// [`Device::validate_chip`] read a silicon revision ID that doesn't
    /// match [`regs::SEMTECH_SX127X_SI_REV_ID`] — wrong chip, dead chip, or
    /// a broken SPI bus.
    SiliconRevMismatch(u8),
}

impl<E> From<ReadRegisterError<E, Infallible>> for RadioError<E> {
    fn from(e: ReadRegisterError<E, Infallible>) -> Self {
        match e {
            ReadRegisterError::BusError(e) => RadioError::Bus(e),
            ReadRegisterError::DeserializationError(_) => unreachable!(),
        }
    }
}

impl<E> From<WriteRegisterError<E, Infallible>> for RadioError<E> {
    fn from(e: WriteRegisterError<E, Infallible>) -> Self {
        match e {
            WriteRegisterError::BusError(e) => RadioError::Bus(e),
            WriteRegisterError::SerializationError(_) => unreachable!(),
        }
    }
}

/// Low-level SPI handle to an SX127x radio: single-register and raw
/// multi-byte access, FIFO read/write.
pub struct Device<SPI> {
    spi: SPI,
}

impl<SPI> Device<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    pub fn release(self) -> SPI {
        self.spi
    }

    /// Direct access to the underlying bus, for tests that need to stage
    /// state on a mock transport the register API has no way to reach.
    #[cfg(test)]
    pub(crate) fn spi_mut(&mut self) -> &mut SPI {
        &mut self.spi
    }
}

impl<SPI> Device<SPI>
where
    SPI: embedded_hal::spi::SpiDevice,
{
    /// Reads the single-byte register at `ADDR`.
    pub fn read_reg<const ADDR: u8>(&mut self) -> Result<u8, RadioError<SPI::Error>> {
        let reg: RawReg<ADDR> = regiface::spi::blocking::read_register(&mut self.spi)?;
        Ok(reg.0)
    }

    /// Writes the single-byte register at `ADDR`.
    pub fn write_reg<const ADDR: u8>(&mut self, val: u8) -> Result<(), RadioError<SPI::Error>> {
        regiface::spi::blocking::write_register(&mut self.spi, RawReg::<ADDR>(val))?;
        Ok(())
    }

    /// Reads `buf.len()` consecutive registers starting at `addr`, for the
    /// handful of multi-byte fields (carrier frequency) that don't fit the
    /// one-register-per-type model of [`RawReg`].
    pub fn read_regs(&mut self, addr: u8, buf: &mut [u8]) -> Result<(), RadioError<SPI::Error>> {
        self.spi
            .transaction(&mut [
                embedded_hal::spi::Operation::Write(&[addr & SPI_READ_MASK]),
                embedded_hal::spi::Operation::Read(buf),
            ])
            .map_err(RadioError::Bus)
    }

    /// Writes `data` into consecutive registers starting at `addr`.
    pub fn write_regs(&mut self, addr: u8, data: &[u8]) -> Result<(), RadioError<SPI::Error>> {
        self.spi
            .transaction(&mut [
                embedded_hal::spi::Operation::Write(&[addr | SPI_WRITE_BIT]),
                embedded_hal::spi::Operation::Write(data),
            ])
            .map_err(RadioError::Bus)
    }

    /// Writes `buf[1:]` into the FIFO register. `buf[0]` is overwritten with
    /// the FIFO write command so the caller's frame buffer (which reserves
    /// that leading byte, see [`crate::Frame::buf_mut`]) can be handed
    /// straight through without a copy.
    pub fn write_fifo(&mut self, buf: &mut [u8]) -> Result<(), RadioError<SPI::Error>> {
        debug_assert!(!buf.is_empty());
        buf[0] = regs::FIFO | SPI_WRITE_BIT;
        self.spi
            .transaction(&mut [embedded_hal::spi::Operation::Write(buf)])
            .map_err(RadioError::Bus)
    }

    /// Reads `buf.len()` bytes from the FIFO register into `buf`.
    pub fn read_fifo(&mut self, buf: &mut [u8]) -> Result<(), RadioError<SPI::Error>> {
        self.read_regs(regs::FIFO, buf)
    }

    /// Sets the FIFO address pointer, TX base and RX base to `offset`.
    pub fn write_fifo_ptr(&mut self, offset: u8) -> Result<(), RadioError<SPI::Error>> {
        self.write_regs(regs::LORA_FIFO_ADDR_PTR, &[offset, offset, offset])
    }

    /// Reads the silicon revision register and returns an error if it
    /// doesn't match [`regs::SEMTECH_SX127X_SI_REV_ID`].
    pub fn validate_chip(&mut self) -> Result<(), RadioError<SPI::Error>> {
        let rev = self.read_reg::<{ regs::CHIP_VRSN }>()?;
        if rev != regs::SEMTECH_SX127X_SI_REV_ID {
            return Err(RadioError::SiliconRevMismatch(rev));
        }
        Ok(())
    }
}

impl<SPI> Device<SPI>
where
    SPI: embedded_hal_async::spi::SpiDevice,
{
    /// Async counterpart of [`Device::read_reg`].
    pub async fn read_reg_async<const ADDR: u8>(&mut self) -> Result<u8, RadioError<SPI::Error>> {
        let reg: RawReg<ADDR> = regiface::spi::r#async::read_register(&mut self.spi).await?;
        Ok(reg.0)
    }

    /// Async counterpart of [`Device::write_reg`].
    pub async fn write_reg_async<const ADDR: u8>(
        &mut self,
        val: u8,
    ) -> Result<(), RadioError<SPI::Error>> {
        regiface::spi::r#async::write_register(&mut self.spi, RawReg::<ADDR>(val)).await?;
        Ok(())
    }

    /// Async counterpart of [`Device::write_fifo`].
    pub async fn write_fifo_async(&mut self, buf: &mut [u8]) -> Result<(), RadioError<SPI::Error>> {
        debug_assert!(!buf.is_empty());
        buf[0] = regs::FIFO | SPI_WRITE_BIT;
        self.spi
            .transaction(&mut [embedded_hal_async::spi::Operation::Write(buf)])
            .await
            .map_err(RadioError::Bus)
    }
}
