/// Wire frames for the AT-over-SPI link.
///
/// Every exchange on the bus is one fixed-width frame: 7 bytes for requests
/// and data (`[opcode, 0x00, 0x00, b3..b6]`), 3 bytes for the done signals
/// (`[opcode, 0x00, 0x00]`). All opcode knowledge lives here; the rest of
/// the driver never touches raw opcode bytes.

use crate::error::ProtocolError;

/// Payload capacity of one data frame.
pub const MAX_PAYLOAD: usize = 4;

/// Length of a control or data frame on the wire.
pub const CONTROL_FRAME_LEN: usize = 7;

/// Length of a done frame on the wire.
pub const DONE_FRAME_LEN: usize = 3;

/// First byte of every frame the host sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// Master requests to send data to the slave.
    WriteRequest = 0x01,
    /// Master requests the slave's status frame.
    StatusRequest = 0x02,
    /// Master writes a data frame to the slave.
    WriteData = 0x03,
    /// Master reads a data frame from the slave.
    ReadData = 0x04,
    /// Master signals its write is complete.
    WriteDone = 0x07,
    /// Master acknowledges the read is complete.
    ReadDone = 0x08,
}

impl Opcode {
    pub fn from_byte(byte: u8) -> Result<Self, ProtocolError> {
        match byte {
            0x01 => Ok(Opcode::WriteRequest),
            0x02 => Ok(Opcode::StatusRequest),
            0x03 => Ok(Opcode::WriteData),
            0x04 => Ok(Opcode::ReadData),
            0x07 => Ok(Opcode::WriteDone),
            0x08 => Ok(Opcode::ReadDone),
            other => Err(ProtocolError::UnknownOpcode(other)),
        }
    }

    /// On-wire length of a frame carrying this opcode.
    pub fn frame_len(self) -> usize {
        match self {
            Opcode::WriteDone | Opcode::ReadDone => DONE_FRAME_LEN,
            _ => CONTROL_FRAME_LEN,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    opcode: Opcode,
    payload: [u8; MAX_PAYLOAD],
    len: usize,
}

impl Frame {
    fn bare(opcode: Opcode) -> Self {
        Frame {
            opcode,
            payload: [0; MAX_PAYLOAD],
            len: 0,
        }
    }

    /// The fixed "master requests to send" frame.
    pub fn write_request() -> Self {
        Frame::bare(Opcode::WriteRequest)
    }

    /// The fixed "request slave status" frame.
    pub fn status_request() -> Self {
        Frame::bare(Opcode::StatusRequest)
    }

    /// A data frame carrying up to [`MAX_PAYLOAD`] caller bytes.
    pub fn write_data(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(ProtocolError::PayloadTooLong(payload.len()));
        }
        let mut frame = Frame::bare(Opcode::WriteData);
        frame.payload[..payload.len()].copy_from_slice(payload);
        frame.len = payload.len();
        Ok(frame)
    }

    /// The fixed "read data" frame.
    pub fn read_data() -> Self {
        Frame::bare(Opcode::ReadData)
    }

    pub fn write_done() -> Self {
        Frame::bare(Opcode::WriteDone)
    }

    pub fn read_done() -> Self {
        Frame::bare(Opcode::ReadDone)
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.len]
    }

    /// Serialize to the fixed on-wire form for this opcode.
    pub fn encode(&self) -> Vec<u8> {
        let mut raw = vec![0u8; self.opcode.frame_len()];
        raw[0] = self.opcode as u8;
        if raw.len() == CONTROL_FRAME_LEN {
            raw[3..3 + self.len].copy_from_slice(&self.payload[..self.len]);
        }
        raw
    }

    /// Parse a raw frame. A buffer shorter than the opcode's declared shape
    /// is a protocol error, never silently accepted.
    pub fn decode(raw: &[u8]) -> Result<Self, ProtocolError> {
        let opcode = Opcode::from_byte(*raw.first().ok_or(ProtocolError::Truncated {
            expected: DONE_FRAME_LEN,
            got: 0,
        })?)?;
        let expected = opcode.frame_len();
        if raw.len() < expected {
            return Err(ProtocolError::Truncated {
                expected,
                got: raw.len(),
            });
        }
        let mut frame = Frame::bare(opcode);
        if expected == CONTROL_FRAME_LEN {
            frame.payload.copy_from_slice(&raw[3..CONTROL_FRAME_LEN]);
            frame.len = MAX_PAYLOAD;
        }
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_frames_are_zero_padded() {
        assert_eq!(Frame::write_request().encode(), vec![0x01, 0, 0, 0, 0, 0, 0]);
        assert_eq!(Frame::status_request().encode(), vec![0x02, 0, 0, 0, 0, 0, 0]);
        assert_eq!(Frame::read_data().encode(), vec![0x04, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_done_frames_are_three_bytes() {
        assert_eq!(Frame::write_done().encode(), vec![0x07, 0, 0]);
        assert_eq!(Frame::read_done().encode(), vec![0x08, 0, 0]);
    }

    #[test]
    fn test_data_frame_carries_payload_in_trailing_bytes() {
        let frame = Frame::write_data(b"AT\r\n").unwrap();
        assert_eq!(frame.encode(), vec![0x03, 0, 0, 0x41, 0x54, 0x0D, 0x0A]);
    }

    #[test]
    fn test_short_payload_padded_with_zeros() {
        let frame = Frame::write_data(b"AT").unwrap();
        assert_eq!(frame.encode(), vec![0x03, 0, 0, 0x41, 0x54, 0, 0]);
        assert_eq!(frame.payload(), b"AT");
    }

    #[test]
    fn test_oversize_payload_rejected() {
        let err = Frame::write_data(b"AT+GMR\r\n").unwrap_err();
        assert_eq!(err, ProtocolError::PayloadTooLong(8));
    }

    #[test]
    fn test_decode_roundtrip() {
        let frame = Frame::write_data(b"OK\r\n").unwrap();
        let decoded = Frame::decode(&frame.encode()).unwrap();
        assert_eq!(decoded.opcode(), Opcode::WriteData);
        assert_eq!(decoded.payload(), b"OK\r\n");
    }

    #[test]
    fn test_unknown_opcode_is_an_error() {
        assert_eq!(
            Frame::decode(&[0x05, 0, 0, 0, 0, 0, 0]).unwrap_err(),
            ProtocolError::UnknownOpcode(0x05)
        );
    }

    #[test]
    fn test_truncated_frame_is_an_error() {
        assert_eq!(
            Frame::decode(&[0x03, 0, 0]).unwrap_err(),
            ProtocolError::Truncated { expected: 7, got: 3 }
        );
        assert_eq!(
            Frame::decode(&[]).unwrap_err(),
            ProtocolError::Truncated { expected: 3, got: 0 }
        );
    }
}
