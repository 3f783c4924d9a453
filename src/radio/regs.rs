//! SX127x register addresses (7-bit, MSB selects read/write on the wire).

pub const FIFO: u8 = 0x00;
pub const OPMODE: u8 = 0x01;
pub const FREQ_MSB: u8 = 0x06;
pub const FREQ_MID: u8 = 0x07;
pub const FREQ_LSB: u8 = 0x08;
pub const PA_CFG: u8 = 0x09;
pub const LNA: u8 = 0x0C;

pub const LORA_FIFO_ADDR_PTR: u8 = 0x0D;
pub const LORA_FIFO_TX_BASE: u8 = 0x0E;
pub const LORA_FIFO_RX_BASE: u8 = 0x0F;
pub const LORA_FIFO_RX_CURRENT_ADDR: u8 = 0x10;
pub const LORA_IRQ_MASK: u8 = 0x11;
pub const LORA_IRQ_FLAGS: u8 = 0x12;
pub const LORA_RX_NB_BYTES: u8 = 0x13;
pub const LORA_CFG1: u8 = 0x1D;
pub const LORA_CFG2: u8 = 0x1E;
pub const LORA_RX_SYM_TMOUT: u8 = 0x1F;
pub const LORA_PREAMBLE_LEN: u8 = 0x20;
pub const LORA_PREAMBLE_LEN_LSB: u8 = 0x21;
pub const LORA_CFG3: u8 = 0x26;
pub const LORA_RSSI_WIDEBAND: u8 = 0x2C;
pub const LORA_IF_FREQ_2: u8 = 0x2F;
pub const LORA_DTCT_OPTMZ: u8 = 0x31;
pub const LORA_SYNC_WORD: u8 = 0x39;

pub const DIOMAP1: u8 = 0x40;
pub const DIOMAP2: u8 = 0x41;
pub const CHIP_VRSN: u8 = 0x42;

/// Expected value of [`CHIP_VRSN`] on genuine silicon.
pub const SEMTECH_SX127X_SI_REV_ID: u8 = 0x12;

pub const FREQ_MIN: u32 = 137_000_000;
pub const FREQ_MAX: u32 = 1_020_000_000;
