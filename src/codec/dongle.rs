//! The proprietary WiFi-dongle TCP protocol: an 18-byte custom header
//! wrapping an embedded Modbus-RTU-shaped data frame, with a
//! CRC-16/Modbus trailer over the data frame only.

use crate::codec::modbus_frame::{is_exception, ModbusFunction};
use crate::error::Error;
use crate::serial::Serial;

pub const PREFIX: [u8; 2] = [0xA1, 0x1A];
pub const PROTOCOL_VERSION: u16 = 1;
pub const HEADER_LEN: usize = 20;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TcpFunction {
    Heartbeat,
    TranslatedData,
    ReadParam,
    WriteParam,
}

impl TcpFunction {
    fn to_byte(self) -> u8 {
        match self {
            TcpFunction::Heartbeat => 0xC1,
            TcpFunction::TranslatedData => 0xC2,
            TcpFunction::ReadParam => 0xC3,
            TcpFunction::WriteParam => 0xC4,
        }
    }

    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0xC1 => Some(TcpFunction::Heartbeat),
            0xC2 => Some(TcpFunction::TranslatedData),
            0xC3 => Some(TcpFunction::ReadParam),
            0xC4 => Some(TcpFunction::WriteParam),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub enum RequestPayload {
    Read { count: u16 },
    WriteSingle { value: u16 },
    WriteMultiple { values: Vec<u16> },
}

#[derive(Clone, Debug)]
pub struct RequestFrame {
    pub tcp_function: TcpFunction,
    pub dongle_serial: Serial,
    pub inverter_serial: Serial,
    pub modbus_function: ModbusFunction,
    pub start_register: u16,
    pub payload: RequestPayload,
}

fn crc16_modbus(data: &[u8]) -> u16 {
    crc16::State::<crc16::MODBUS>::calculate(data)
}

impl RequestFrame {
    /// Encodes the full packet, including the 20-byte header and the
    /// 2-byte CRC trailer computed over the embedded data frame.
    pub fn encode(&self) -> Vec<u8> {
        let mut data_frame = Vec::with_capacity(16);
        data_frame.push(0x00); // action: request
        data_frame.push(self.modbus_function as u8);
        data_frame.extend_from_slice(self.inverter_serial.as_bytes());
        data_frame.extend_from_slice(&self.start_register.to_le_bytes());

        match &self.payload {
            RequestPayload::Read { count } => {
                data_frame.extend_from_slice(&count.to_le_bytes());
            }
            RequestPayload::WriteSingle { value } => {
                data_frame.extend_from_slice(&value.to_le_bytes());
            }
            RequestPayload::WriteMultiple { values } => {
                data_frame.extend_from_slice(&(values.len() as u16).to_le_bytes());
                data_frame.push((values.len() * 2) as u8);
                for v in values {
                    data_frame.extend_from_slice(&v.to_le_bytes());
                }
            }
        }

        let crc = crc16_modbus(&data_frame);
        let data_length = (data_frame.len() + 2) as u16;

        let mut out = Vec::with_capacity(HEADER_LEN + data_frame.len() + 2);
        out.extend_from_slice(&PREFIX);
        out.extend_from_slice(&PROTOCOL_VERSION.to_le_bytes());
        // frame length is filled in after we know the total size; reserve.
        out.extend_from_slice(&[0, 0]);
        out.push(0x01); // address
        out.push(self.tcp_function.to_byte());
        out.extend_from_slice(self.dongle_serial.as_bytes());
        out.extend_from_slice(&data_length.to_le_bytes());
        out.extend_from_slice(&data_frame);
        out.extend_from_slice(&crc.to_le_bytes());

        let frame_length = (out.len() - 6) as u16;
        out[4..6].copy_from_slice(&frame_length.to_le_bytes());

        out
    }
}

#[derive(Clone, Debug)]
pub struct ResponseFrame {
    pub tcp_function: TcpFunction,
    pub dongle_serial: Serial,
    pub inverter_serial: Serial,
    pub modbus_function: u8,
    pub start_register: u16,
    pub registers: Vec<u16>,
}

/// Parses and validates a complete received packet: prefix, declared
/// length, CRC, and the Modbus-exception bit on the embedded function
/// byte.
pub fn decode(buf: &[u8]) -> Result<ResponseFrame, Error> {
    if buf.len() < HEADER_LEN + 2 {
        return Err(Error::read("dongle packet shorter than the minimum header"));
    }
    if buf[0..2] != PREFIX {
        return Err(Error::read("dongle packet missing 0xA1 0x1A prefix"));
    }

    let frame_length = u16::from_le_bytes([buf[4], buf[5]]) as usize;
    let total_len = frame_length + 6;
    if buf.len() < total_len {
        return Err(Error::read("dongle packet truncated before declared length"));
    }
    let buf = &buf[..total_len];

    let tcp_function = TcpFunction::from_byte(buf[7])
        .ok_or_else(|| Error::read(format!("unknown dongle tcp function byte {:#04x}", buf[7])))?;
    let dongle_serial = Serial::from(&buf[8..18]);
    let data_length = u16::from_le_bytes([buf[18], buf[19]]) as usize;
    if data_length < 2 {
        return Err(Error::read("dongle packet data length too small for CRC"));
    }
    let data_frame_len = data_length - 2;
    let data_frame_start = HEADER_LEN;
    let data_frame_end = data_frame_start + data_frame_len;
    if buf.len() < data_frame_end + 2 {
        return Err(Error::read("dongle packet truncated inside data frame"));
    }
    let data_frame = &buf[data_frame_start..data_frame_end];
    let received_crc = u16::from_le_bytes([buf[data_frame_end], buf[data_frame_end + 1]]);
    let computed_crc = crc16_modbus(data_frame);
    if received_crc != computed_crc {
        return Err(Error::read(format!(
            "dongle packet CRC mismatch: received {:#06x}, computed {:#06x}",
            received_crc, computed_crc
        )));
    }

    let _action = data_frame[0];
    let modbus_function = data_frame[1];
    if is_exception(modbus_function) {
        let exception_code = data_frame.get(12).copied().unwrap_or(0);
        return Err(Error::read(format!(
            "dongle reported a Modbus exception, code {}",
            exception_code
        )));
    }
    let inverter_serial = Serial::from(&data_frame[2..12]);
    let start_register = u16::from_le_bytes([data_frame[12], data_frame[13]]);

    let registers = if data_frame.len() > 14 {
        // response read frame: [.., byte_count, register bytes...]
        let byte_count = data_frame[14] as usize;
        let values_start = 15;
        let available = data_frame.len().saturating_sub(values_start);
        let n = byte_count.min(available) / 2;
        (0..n)
            .map(|i| {
                let lo = data_frame[values_start + i * 2];
                let hi = data_frame[values_start + i * 2 + 1];
                u16::from_le_bytes([lo, hi])
            })
            .collect()
    } else {
        Vec::new()
    };

    Ok(ResponseFrame {
        tcp_function,
        dongle_serial,
        inverter_serial,
        modbus_function,
        start_register,
        registers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::modbus_frame::ModbusFunction;

    #[test]
    fn read_input_request_matches_known_vector() {
        let frame = RequestFrame {
            tcp_function: TcpFunction::TranslatedData,
            dongle_serial: Serial::from("BA12345678"),
            inverter_serial: Serial::from("CE12345678"),
            modbus_function: ModbusFunction::ReadInput,
            start_register: 0,
            payload: RequestPayload::Read { count: 32 },
        };
        let encoded = frame.encode();
        assert_eq!(encoded.len(), 38);

        let expected_prefix: &[u8] = &[
            0xA1, 0x1A, 0x01, 0x00, 0x20, 0x00, 0x01, 0xC2, 0x42, 0x41, 0x31, 0x32, 0x33, 0x34,
            0x35, 0x36, 0x37, 0x38, 0x12, 0x00, 0x00, 0x04, 0x43, 0x45, 0x31, 0x32, 0x33, 0x34,
            0x35, 0x36, 0x37, 0x38, 0x00, 0x00, 0x20, 0x00,
        ];
        assert_eq!(&encoded[..36], expected_prefix);

        let data_frame = &encoded[20..36];
        let crc = crc16_modbus(data_frame);
        assert_eq!(&encoded[36..38], &crc.to_le_bytes());
    }

    #[test]
    fn decode_rejects_bad_prefix() {
        let mut bytes = vec![0u8; 22];
        bytes[0] = 0xAA;
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn round_trip_read_response() {
        let request = RequestFrame {
            tcp_function: TcpFunction::TranslatedData,
            dongle_serial: Serial::from("BA12345678"),
            inverter_serial: Serial::from("CE12345678"),
            modbus_function: ModbusFunction::ReadInput,
            start_register: 0,
            payload: RequestPayload::Read { count: 2 },
        };
        let encoded = request.encode();
        // the device never echoes a request; this check just confirms the
        // request frame itself decodes as a well-formed envelope when we
        // flip the action byte to a response shape with register payload.
        let mut response = encoded.clone();
        let data_frame_start = HEADER_LEN;
        response[data_frame_start] = 0x01; // action: response
        let mut data_frame = response[data_frame_start..response.len() - 2].to_vec();
        data_frame.push(4); // byte_count
        data_frame.extend_from_slice(&1u16.to_le_bytes());
        data_frame.extend_from_slice(&2u16.to_le_bytes());

        let crc = crc16_modbus(&data_frame);
        let data_length = (data_frame.len() + 2) as u16;

        let mut out = Vec::new();
        out.extend_from_slice(&PREFIX);
        out.extend_from_slice(&PROTOCOL_VERSION.to_le_bytes());
        out.extend_from_slice(&[0, 0]);
        out.push(0x01);
        out.push(TcpFunction::TranslatedData.to_byte());
        out.extend_from_slice(request.dongle_serial.as_bytes());
        out.extend_from_slice(&data_length.to_le_bytes());
        out.extend_from_slice(&data_frame);
        out.extend_from_slice(&crc.to_le_bytes());
        let frame_length = (out.len() - 6) as u16;
        out[4..6].copy_from_slice(&frame_length.to_le_bytes());

        let parsed = decode(&out).expect("well-formed response decodes");
        assert_eq!(parsed.registers, vec![1, 2]);
        assert_eq!(parsed.start_register, 0);
    }
}
