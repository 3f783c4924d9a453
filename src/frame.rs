//! The HeyMac frame codec.
//!
//! A frame's field layout is not fixed: every optional field's presence
//! and size is inferred by walking the `FCTL` flag byte left to right.
//! [`Frame`] keeps no baked-in offset constants; [`Frame::header_end`] is
//! the single cursor walk used by both the builder setters and [`Frame::parse`],
//! so the two halves can never disagree about where a field lives.

use bitflags::bitflags;

/// One octet reserved at the front of the buffer for the SPI FIFO-write
/// command byte, so a frame's buffer can be handed to the radio's FIFO
/// write without a copy.
const BUF_HEAD: usize = 1;

/// Total bytes available to a frame's own content (excludes [`BUF_HEAD`]).
pub const FRAME_MAX: usize = crate::FRAME_MAX;

bitflags! {
    /// Frame Control byte. Bit meanings per the HeyMac wire format.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Fctl: u8 {
        /// Pending frame follows.
        const PENDING   = 0x01;
        /// Multihop: `Hops` and `TxAddr` fields present.
        const MULTIHOP  = 0x02;
        /// SrcAddr present.
        const SRC_ADDR  = 0x04;
        /// Information Elements present.
        const IES       = 0x08;
        /// DstAddr present.
        const DST_ADDR  = 0x10;
        /// NetId present.
        const NET_ID    = 0x20;
        /// Long (64-bit) addressing, else 16-bit.
        const LONG_ADDR = 0x40;
        /// Extended frame; remaining bytes are opaque.
        const EXTENDED  = 0x80;
    }
}

/// Protocol ID. Only `CsmaV0` is accepted by this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pid {
    CsmaV0 = 0xE4,
}

impl Pid {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0xE4 => Some(Pid::CsmaV0),
            _ => None,
        }
    }
}

/// Why a builder operation refused to modify the frame. The frame is left
/// untouched in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameBuildError {
    /// Not enough room remains in the buffer for the new field.
    NoRoom,
    /// The field ordering contract was violated (e.g. multihop already set,
    /// or the address width doesn't match the current `L` flag).
    OrderingViolation,
}

/// Why [`Frame::parse`] rejected a received buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameParseError {
    /// Fewer bytes than the minimum two-byte header.
    TooShort,
    /// The PID byte was not [`Pid::CsmaV0`].
    WrongProtocol,
    /// The header plus the multihop/MIC tail leaves zero or negative room
    /// for a payload.
    NegativePayload,
}

/// A HeyMac frame: a fixed-capacity buffer plus the bookkeeping needed to
/// append fields in order (when building) or recover them (when parsed).
///
/// A frame is either *outbound* (`received_size == 0`, being built with the
/// setters below) or *inbound* (`received_size > 0`, produced by
/// [`Frame::parse`]); the transition is one-way.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    buf: [u8; BUF_HEAD + FRAME_MAX],
    payload_offset: u16,
    payload_size: u16,
    mic_size: u16,
    received_size: u16,
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    /// A fresh outbound frame: PID unset, no flags, empty payload.
    pub fn new() -> Self {
        let mut buf = [0u8; BUF_HEAD + FRAME_MAX];
        buf[BUF_HEAD] = 0; // PID, invalid until set_protocol()
        buf[BUF_HEAD + 1] = 0; // FCTL
        Frame {
            buf,
            payload_offset: 0,
            payload_size: 0,
            mic_size: 0,
            received_size: 0,
        }
    }

    /// Parse a buffer of `n` bytes (PID+FCTL onward, *not* including the
    /// reserved SPI-prefix byte) received from the radio into an inbound
    /// frame.
    pub fn parse(bytes: &[u8], n: usize) -> Result<Self, FrameParseError> {
        if !(2..=FRAME_MAX).contains(&n) {
            return Err(FrameParseError::TooShort);
        }
        let mut buf = [0u8; BUF_HEAD + FRAME_MAX];
        buf[BUF_HEAD..BUF_HEAD + n].copy_from_slice(&bytes[..n]);

        let mut frm = Frame {
            buf,
            payload_offset: 0,
            payload_size: 0,
            mic_size: 0,
            received_size: n as u16,
        };

        if Pid::from_byte(frm.buf[BUF_HEAD]).is_none() {
            return Err(FrameParseError::WrongProtocol);
        }

        let fctl = frm.fctl();
        let (header_end, mic_size) = frm.header_end(fctl);
        frm.mic_size = mic_size;

        if (header_end as u16) >= frm.received_size {
            return Err(FrameParseError::NegativePayload);
        }

        let mhop_size = mhop_size(fctl);
        let payload_size =
            (frm.received_size as i32) - (header_end as i32) - (mic_size as i32) - (mhop_size as i32);
        if payload_size <= 0 {
            return Err(FrameParseError::NegativePayload);
        }

        frm.payload_offset = header_end as u16;
        frm.payload_size = payload_size as u16;
        Ok(frm)
    }

    /// The frame content (PID onward), not including the reserved
    /// SPI-prefix byte.
    pub fn frm(&self) -> &[u8] {
        &self.buf[BUF_HEAD..BUF_HEAD + self.frame_size() as usize]
    }

    /// The whole buffer including the reserved leading SPI-prefix byte, for
    /// handing directly to [`crate::radio::Device::write_fifo`].
    pub fn buf(&self) -> &[u8] {
        &self.buf[..BUF_HEAD + self.frame_size() as usize]
    }

    /// Mutable access to the whole buffer, including the reserved leading
    /// byte the radio driver overwrites with its FIFO-write command.
    pub fn buf_mut(&mut self) -> &mut [u8] {
        let sz = self.frame_size() as usize;
        &mut self.buf[..BUF_HEAD + sz]
    }

    /// Serialised frame size, excluding the reserved leading byte.
    ///
    /// Before any payload has been set, `payload_offset` is still zero, so
    /// the header's own length is recomputed from `FCTL` rather than taken
    /// from the (not yet initialised) cached offset.
    pub fn frame_size(&self) -> u16 {
        if self.received_size != 0 {
            return self.received_size;
        }
        let fctl = self.fctl();
        let base = if self.payload_size == 0 {
            self.header_end(fctl).0 as u16
        } else {
            self.payload_offset
        };
        base + self.payload_size + self.mic_size + mhop_size(fctl)
    }

    /// Buffer size, including the reserved leading byte.
    pub fn buf_size(&self) -> u16 {
        BUF_HEAD as u16 + self.frame_size()
    }

    pub fn fctl(&self) -> Fctl {
        Fctl::from_bits_truncate(self.buf[BUF_HEAD + 1])
    }

    fn set_fctl(&mut self, f: Fctl) {
        self.buf[BUF_HEAD + 1] = f.bits();
    }

    pub fn set_protocol(&mut self, pid: Pid) {
        self.buf[BUF_HEAD] = pid as u8;
    }

    pub fn payload(&self) -> &[u8] {
        let off = BUF_HEAD + self.payload_offset as usize;
        &self.buf[off..off + self.payload_size as usize]
    }

    /// Walks the flags left to right and returns `(header_end, mic_size)`,
    /// where `header_end` is the offset (from the start of the frame
    /// content, i.e. right after `FCTL`) at which `SrcAddr` ends (or
    /// would end, were it present) — the offset the payload begins at.
    ///
    /// This is the one place field order is encoded; builder setters and
    /// [`Frame::parse`] both call it so they can never disagree.
    fn header_end(&self, fctl: Fctl) -> (usize, u16) {
        let mut offset = 2usize; // past PID, FCTL
        if fctl.contains(Fctl::NET_ID) {
            offset += 2;
        }
        if fctl.contains(Fctl::DST_ADDR) {
            offset += addr_size(fctl);
        }
        let mut mic_size = 0u16;
        if fctl.contains(Fctl::IES) {
            let ie_sz = self.ie_size(offset);
            offset += ie_sz;
            mic_size = self.mic_size_from_ie(offset);
        }
        if fctl.contains(Fctl::SRC_ADDR) {
            offset += addr_size(fctl);
        }
        (offset, mic_size)
    }

    /// Information Elements are reserved in this core and always
    /// contribute zero bytes (spec Non-goals: "full IE processing").
    fn ie_size(&self, _ie_offset: usize) -> usize {
        0
    }

    /// MIC length as determined by an IE; always zero in this core.
    fn mic_size_from_ie(&self, _offset: usize) -> u16 {
        0
    }

    pub fn set_net_id(&mut self, net_id: u16) {
        let fctl = self.fctl();
        let offset = 2; // NetId is always the first optional field
        self.buf[BUF_HEAD + offset..BUF_HEAD + offset + 2].copy_from_slice(&net_id.to_be_bytes());
        self.set_fctl(fctl | Fctl::NET_ID);
    }

    pub fn set_dst_addr16(&mut self, dst_addr: u16) {
        let fctl = self.fctl();
        let offset = dst_addr_offset(fctl);
        self.buf[BUF_HEAD + offset..BUF_HEAD + offset + 2].copy_from_slice(&dst_addr.to_be_bytes());
        self.set_fctl((fctl | Fctl::DST_ADDR) - Fctl::LONG_ADDR);
    }

    pub fn set_dst_addr64(&mut self, dst_addr: u64) {
        let fctl = self.fctl();
        let offset = dst_addr_offset(fctl);
        self.buf[BUF_HEAD + offset..BUF_HEAD + offset + 8].copy_from_slice(&dst_addr.to_be_bytes());
        self.set_fctl(fctl | Fctl::DST_ADDR | Fctl::LONG_ADDR);
    }

    pub fn set_src_addr16(&mut self, src_addr: u16) {
        let fctl = self.fctl();
        let (offset, _) = self.header_end(fctl & !Fctl::SRC_ADDR);
        self.buf[BUF_HEAD + offset..BUF_HEAD + offset + 2].copy_from_slice(&src_addr.to_be_bytes());
        self.set_fctl((fctl | Fctl::SRC_ADDR) - Fctl::LONG_ADDR);
    }

    pub fn set_src_addr64(&mut self, src_addr: u64) {
        let fctl = self.fctl();
        let (offset, _) = self.header_end(fctl & !Fctl::SRC_ADDR);
        self.buf[BUF_HEAD + offset..BUF_HEAD + offset + 8].copy_from_slice(&src_addr.to_be_bytes());
        self.set_fctl(fctl | Fctl::SRC_ADDR | Fctl::LONG_ADDR);
    }

    /// Writes `payld` into the payload area (after any NetId/DstAddr/IEs/
    /// SrcAddr fields already set). Fails with [`FrameBuildError::NoRoom`]
    /// if it would not fit within [`FRAME_MAX`]; the frame is left
    /// unchanged on failure.
    pub fn set_payload(&mut self, payld: &[u8]) -> Result<(), FrameBuildError> {
        let fctl = self.fctl();
        let (offset, mic_size) = self.header_end(fctl);
        if offset + payld.len() > FRAME_MAX {
            return Err(FrameBuildError::NoRoom);
        }
        self.buf[BUF_HEAD + offset..BUF_HEAD + offset + payld.len()].copy_from_slice(payld);
        self.payload_offset = offset as u16;
        self.payload_size = payld.len() as u16;
        self.mic_size = mic_size;
        Ok(())
    }

    /// Appends `bytes` right after whatever content the frame currently
    /// holds (the header on a fresh frame, or after a previously appended
    /// command on a frame already carrying one). Used by
    /// [`crate::command`] so successive commands land end to end rather
    /// than overwriting each other.
    pub(crate) fn append_payload(&mut self, bytes: &[u8]) -> Result<(), FrameBuildError> {
        let fctl = self.fctl();
        let cur = self.frame_size() as usize;
        if cur + bytes.len() > FRAME_MAX {
            return Err(FrameBuildError::NoRoom);
        }
        self.buf[BUF_HEAD + cur..BUF_HEAD + cur + bytes.len()].copy_from_slice(bytes);
        if self.payload_size == 0 {
            let (header_end, mic_size) = self.header_end(fctl);
            self.payload_offset = header_end as u16;
            self.mic_size = mic_size;
        }
        self.payload_size += bytes.len() as u16;
        Ok(())
    }

    /// Sets the payload offset (from the current header end) without
    /// copying bytes, used by [`crate::command`] which writes directly
    /// into the frame's buffer and then records how much it wrote.
    pub fn set_payload_size(&mut self, sz: u16) {
        let fctl = self.fctl();
        let (offset, mic_size) = self.header_end(fctl);
        self.payload_offset = offset as u16;
        self.payload_size = sz;
        self.mic_size = mic_size;
    }

    /// Room remaining for more payload/command bytes given the current
    /// frame size, per [`FRAME_MAX`].
    pub fn remaining(&self) -> u16 {
        FRAME_MAX as u16 - self.frame_size()
    }

    /// Appends `Hops` + 16-bit `TxAddr`. Requires `L` currently clear and
    /// `M` not yet set.
    pub fn set_multihop16(&mut self, hops: u8, tx_addr: u16) -> Result<(), FrameBuildError> {
        let fctl = self.fctl();
        if fctl.contains(Fctl::MULTIHOP) || fctl.contains(Fctl::LONG_ADDR) {
            return Err(FrameBuildError::OrderingViolation);
        }
        let offset = (self.payload_offset + self.payload_size + self.mic_size) as usize;
        if offset + 1 + 2 > FRAME_MAX {
            return Err(FrameBuildError::NoRoom);
        }
        self.buf[BUF_HEAD + offset] = hops;
        self.buf[BUF_HEAD + offset + 1..BUF_HEAD + offset + 3].copy_from_slice(&tx_addr.to_be_bytes());
        self.set_fctl(fctl | Fctl::MULTIHOP);
        Ok(())
    }

    /// Appends `Hops` + 64-bit `TxAddr`. Requires `L` currently set and
    /// `M` not yet set.
    pub fn set_multihop64(&mut self, hops: u8, tx_addr: u64) -> Result<(), FrameBuildError> {
        let fctl = self.fctl();
        if fctl.contains(Fctl::MULTIHOP) || !fctl.contains(Fctl::LONG_ADDR) {
            return Err(FrameBuildError::OrderingViolation);
        }
        let offset = (self.payload_offset + self.payload_size + self.mic_size) as usize;
        if offset + 1 + 8 > FRAME_MAX {
            return Err(FrameBuildError::NoRoom);
        }
        self.buf[BUF_HEAD + offset] = hops;
        self.buf[BUF_HEAD + offset + 1..BUF_HEAD + offset + 9].copy_from_slice(&tx_addr.to_be_bytes());
        self.set_fctl(fctl | Fctl::MULTIHOP);
        Ok(())
    }
}

fn addr_size(fctl: Fctl) -> usize {
    if fctl.contains(Fctl::LONG_ADDR) {
        8
    } else {
        2
    }
}

fn mhop_size(fctl: Fctl) -> u16 {
    if fctl.contains(Fctl::MULTIHOP) {
        1 + if fctl.contains(Fctl::LONG_ADDR) { 8 } else { 2 }
    } else {
        0
    }
}

fn dst_addr_offset(fctl: Fctl) -> usize {
    let mut offset = 2;
    if fctl.contains(Fctl::NET_ID) {
        offset += 2;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_and_parse_short_addr_frame() {
        let mut frm = Frame::new();
        frm.set_protocol(Pid::CsmaV0);
        frm.set_net_id(0x1234);
        frm.set_dst_addr16(0x00AB);
        frm.set_src_addr16(0xCD00);
        frm.set_payload(b"ping").unwrap();

        // FCTL = N|D|S = 0x20|0x10|0x04 = 0x34, consistent with the NetId,
        // DstAddr and SrcAddr fields all being present in the byte stream.
        assert_eq!(
            frm.frm(),
            &[0xE4, 0x34, 0x12, 0x34, 0x00, 0xAB, 0xCD, 0x00, 0x70, 0x69, 0x6E, 0x67]
        );

        let n = frm.frame_size() as usize;
        let parsed = Frame::parse(frm.frm(), n).unwrap();
        assert_eq!(parsed.fctl(), frm.fctl());
        assert_eq!(parsed.payload(), b"ping");
    }

    #[test]
    fn long_addr_dst_addr() {
        let mut frm = Frame::new();
        frm.set_protocol(Pid::CsmaV0);
        frm.set_dst_addr64(0x0102030405060708);
        assert!(frm.fctl().contains(Fctl::LONG_ADDR));
        assert_eq!(&frm.frm()[2..10], &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn reject_too_long_frame() {
        let mut frm = Frame::new();
        frm.set_protocol(Pid::CsmaV0);
        // Force the frame to a current size of 253 bytes of payload.
        let payload = [0u8; 251]; // 2 (PID+FCTL) + 251 = 253
        frm.set_payload(&payload).unwrap();
        assert_eq!(frm.frame_size(), 253);
        assert_eq!(frm.remaining(), 3);
    }

    #[test]
    fn settings_are_idempotent_about_fctl() {
        let mut frm = Frame::new();
        frm.set_protocol(Pid::CsmaV0);
        frm.set_src_addr16(0xBEEF);
        assert!(!frm.fctl().contains(Fctl::LONG_ADDR));
        frm.set_src_addr64(0xCAFEDEADBEEF0102);
        assert!(frm.fctl().contains(Fctl::LONG_ADDR));
    }

    #[test]
    fn parse_rejects_wrong_protocol() {
        let bytes = [0x00u8, 0x00];
        assert_eq!(Frame::parse(&bytes, 2), Err(FrameParseError::WrongProtocol));
    }

    #[test]
    fn parse_rejects_negative_payload() {
        // N flag set but only 2 bytes supplied: header alone consumes the buffer.
        let bytes = [0xE4u8, 0x20, 0x00, 0x00];
        assert_eq!(
            Frame::parse(&bytes, 4),
            Err(FrameParseError::NegativePayload)
        );
    }
}
