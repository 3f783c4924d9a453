//! The MAC command builder.
//!
//! Commands are opaque opcode+body sequences appended into a [`Frame`]'s
//! payload area. The top two bits of the opcode byte are fixed to `10`;
//! the low six select the command.

use crate::frame::{Frame, FrameBuildError};

/// Fixed top two bits of every command opcode byte.
pub const CMD_PREFIX: u8 = 0x80;
/// Mask isolating the fixed top two bits.
pub const CMD_PREFIX_MASK: u8 = 0xC0;
/// Mask isolating the command id from the opcode byte.
pub const CMD_MASK: u8 = 0x3F;

/// Command id, the low six bits of the opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Cid {
    Sbcn = 1,
    Ebcn = 2,
    Txt = 3,
    Cbcn = 4,
    Join = 5,
}

fn opcode(cid: Cid) -> u8 {
    CMD_PREFIX | (cid as u8 & CMD_MASK)
}

/// Appends a `TXT` command (opaque text bytes) to `frm`.
///
/// Fails with [`FrameBuildError::NoRoom`] iff `frm`'s current size plus
/// `1 + text.len()` would exceed [`crate::FRAME_MAX`]; the frame is left
/// unchanged on failure.
pub fn txt(frm: &mut Frame, text: &[u8]) -> Result<(), FrameBuildError> {
    // FRAME_MAX is small enough (256B) that a stack buffer is cheap and
    // avoids a second bounds-checked write path.
    if 1 + text.len() > crate::FRAME_MAX {
        return Err(FrameBuildError::NoRoom);
    }
    let mut buf = [0u8; crate::FRAME_MAX];
    buf[0] = opcode(Cid::Txt);
    buf[1..1 + text.len()].copy_from_slice(text);
    frm.append_payload(&buf[..1 + text.len()])
}

/// Appends a `CBCN` (capability beacon) command: `caps:u16` then
/// `status:u16`, big-endian.
pub fn cbcn(frm: &mut Frame, caps: u16, status: u16) -> Result<(), FrameBuildError> {
    let mut buf = [0u8; 5];
    buf[0] = opcode(Cid::Cbcn);
    buf[1..3].copy_from_slice(&caps.to_be_bytes());
    buf[3..5].copy_from_slice(&status.to_be_bytes());
    frm.append_payload(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Pid;

    #[test]
    fn text_command_with_long_src_addr() {
        let mut frm = Frame::new();
        frm.set_protocol(Pid::CsmaV0);
        frm.set_src_addr64(0xCAFEDEADBEEF0102);
        txt(&mut frm, b"ABC").unwrap();

        assert_eq!(frm.payload(), &[0x83, 0x41, 0x42, 0x43]);
        assert_eq!(frm.fctl().bits(), 0x44); // L|S
    }

    #[test]
    fn cbcn_command() {
        let mut frm = Frame::new();
        frm.set_protocol(Pid::CsmaV0);
        cbcn(&mut frm, 0x00CA, 0x0000).unwrap();
        assert_eq!(frm.payload(), &[0x84, 0x00, 0xCA, 0x00, 0x00]);
    }

    #[test]
    fn txt_rejects_text_too_big_for_the_buffer_before_copying() {
        let mut frm = Frame::new();
        frm.set_protocol(Pid::CsmaV0);
        let text = [0u8; crate::FRAME_MAX]; // 1 + FRAME_MAX always overflows
        assert_eq!(txt(&mut frm, &text), Err(FrameBuildError::NoRoom));
    }

    #[test]
    fn reject_too_long_frame() {
        let mut frm = Frame::new();
        frm.set_protocol(Pid::CsmaV0);
        // Push the frame to a current size of 253 bytes (2-byte header + 251).
        let filler = [0u8; 251];
        frm.append_payload(&filler).unwrap();
        assert_eq!(frm.frame_size(), 253);

        let before = frm.frame_size();
        let result = txt(&mut frm, b"ABC"); // 1 + 3 = 4 > remaining 3
        assert_eq!(result, Err(FrameBuildError::NoRoom));
        assert_eq!(frm.frame_size(), before);
    }
}
