use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// The first eight bytes of every binary file. The final `!` is what
/// distinguishes the binary format from its XML sibling, whose files start
/// with `<roblox ` or `<roblox>`.
pub static FILE_MAGIC_HEADER: &[u8] = b"<roblox!";

/// A fixed byte sequence following the magic header, chosen (like PNG's) to
/// catch files mangled by line-ending or encoding conversion.
pub static FILE_SIGNATURE: &[u8] = &[0x89, 0xff, 0x0d, 0x0a, 0x1a, 0x0a];

/// The only file format version this crate understands.
pub const FILE_VERSION: u16 = 0;

/// The conventional contents of the END chunk.
pub static FILE_FOOTER: &[u8] = b"</roblox>";

/// Zigzag-encode a signed 32-bit integer so small magnitudes become small
/// unsigned values.
pub fn encode_i32(value: i32) -> i32 {
    (value << 1) ^ (value >> 31)
}

pub fn decode_i32(value: i32) -> i32 {
    ((value as u32) >> 1) as i32 ^ -(value & 1)
}

/// Zigzag-encode a signed 64-bit integer.
pub fn encode_i64(value: i64) -> i64 {
    (value << 1) ^ (value >> 63)
}

pub fn decode_i64(value: i64) -> i64 {
    ((value as u64) >> 1) as i64 ^ -(value & 1)
}

/// Rotate a float's sign bit from the most significant position to the
/// least significant one. Runs of same-sign floats then share their leading
/// bytes, which compresses better column-wise.
pub fn encode_f32(value: f32) -> u32 {
    let bits = value.to_bits();
    (bits << 1) | (bits >> 31)
}

pub fn decode_f32(value: u32) -> f32 {
    f32::from_bits((value >> 1) | (value << 31))
}

/// Extension methods for reading the primitive shapes used across chunk
/// payloads.
pub trait RbxReadExt: Read {
    fn read_bool(&mut self) -> io::Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    fn read_le_u16(&mut self) -> io::Result<u16> {
        self.read_u16::<LittleEndian>()
    }

    fn read_le_u32(&mut self) -> io::Result<u32> {
        self.read_u32::<LittleEndian>()
    }

    fn read_le_i16(&mut self) -> io::Result<i16> {
        self.read_i16::<LittleEndian>()
    }

    fn read_le_f32(&mut self) -> io::Result<f32> {
        self.read_f32::<LittleEndian>()
    }

    fn read_le_f64(&mut self) -> io::Result<f64> {
        self.read_f64::<LittleEndian>()
    }

    fn read_binary_string(&mut self) -> io::Result<Vec<u8>> {
        let length = self.read_u32::<LittleEndian>()?;

        let mut value = Vec::with_capacity(length as usize);
        self.take(length as u64).read_to_end(&mut value)?;

        if value.len() != length as usize {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "string was shorter than its declared length",
            ));
        }

        Ok(value)
    }

    fn read_string(&mut self) -> io::Result<String> {
        let buffer = self.read_binary_string()?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    fn read_interleaved_i32_array(&mut self, output: &mut [i32]) -> io::Result<()> {
        let mut buffer = vec![0; output.len() * 4];
        self.read_exact(&mut buffer)?;

        for i in 0..output.len() {
            let v0 = buffer[i] as u32;
            let v1 = buffer[i + output.len()] as u32;
            let v2 = buffer[i + output.len() * 2] as u32;
            let v3 = buffer[i + output.len() * 3] as u32;

            output[i] = decode_i32(((v0 << 24) | (v1 << 16) | (v2 << 8) | v3) as i32);
        }

        Ok(())
    }

    fn read_interleaved_u32_array(&mut self, output: &mut [u32]) -> io::Result<()> {
        let mut buffer = vec![0; output.len() * 4];
        self.read_exact(&mut buffer)?;

        for i in 0..output.len() {
            let v0 = buffer[i] as u32;
            let v1 = buffer[i + output.len()] as u32;
            let v2 = buffer[i + output.len() * 2] as u32;
            let v3 = buffer[i + output.len() * 3] as u32;

            output[i] = (v0 << 24) | (v1 << 16) | (v2 << 8) | v3;
        }

        Ok(())
    }

    fn read_interleaved_f32_array(&mut self, output: &mut [f32]) -> io::Result<()> {
        let mut buffer = vec![0; output.len() * 4];
        self.read_exact(&mut buffer)?;

        for i in 0..output.len() {
            let v0 = buffer[i] as u32;
            let v1 = buffer[i + output.len()] as u32;
            let v2 = buffer[i + output.len() * 2] as u32;
            let v3 = buffer[i + output.len() * 3] as u32;

            output[i] = decode_f32((v0 << 24) | (v1 << 16) | (v2 << 8) | v3);
        }

        Ok(())
    }

    fn read_interleaved_i64_array(&mut self, output: &mut [i64]) -> io::Result<()> {
        let mut buffer = vec![0; output.len() * 8];
        self.read_exact(&mut buffer)?;

        for i in 0..output.len() {
            let mut value: u64 = 0;
            for plane in 0..8 {
                value = (value << 8) | buffer[i + output.len() * plane] as u64;
            }

            output[i] = decode_i64(value as i64);
        }

        Ok(())
    }

    /// Read a delta-encoded referent list, as found in `INST` and `PRNT`
    /// chunks and in `Ref`-typed property arrays.
    fn read_referent_array(&mut self, output: &mut [i32]) -> io::Result<()> {
        self.read_interleaved_i32_array(output)?;

        let mut last = 0;
        for value in output.iter_mut() {
            *value += last;
            last = *value;
        }

        Ok(())
    }
}

impl<R: Read> RbxReadExt for R {}

/// Extension methods mirroring [`RbxReadExt`] for writing.
pub trait RbxWriteExt: Write {
    fn write_bool(&mut self, value: bool) -> io::Result<()> {
        self.write_u8(value as u8)
    }

    fn write_le_u16(&mut self, value: u16) -> io::Result<()> {
        self.write_u16::<LittleEndian>(value)
    }

    fn write_le_u32(&mut self, value: u32) -> io::Result<()> {
        self.write_u32::<LittleEndian>(value)
    }

    fn write_le_i16(&mut self, value: i16) -> io::Result<()> {
        self.write_i16::<LittleEndian>(value)
    }

    fn write_le_f32(&mut self, value: f32) -> io::Result<()> {
        self.write_f32::<LittleEndian>(value)
    }

    fn write_le_f64(&mut self, value: f64) -> io::Result<()> {
        self.write_f64::<LittleEndian>(value)
    }

    fn write_binary_string(&mut self, value: &[u8]) -> io::Result<()> {
        self.write_u32::<LittleEndian>(value.len() as u32)?;
        self.write_all(value)
    }

    fn write_string(&mut self, value: &str) -> io::Result<()> {
        self.write_binary_string(value.as_bytes())
    }

    fn write_interleaved_i32_array<I>(&mut self, values: I) -> io::Result<()>
    where
        I: Iterator<Item = i32> + Clone,
    {
        for shift in &[24, 16, 8, 0] {
            for value in values.clone() {
                let encoded = encode_i32(value) >> shift;
                self.write_u8(encoded as u8)?;
            }
        }

        Ok(())
    }

    fn write_interleaved_u32_array(&mut self, values: &[u32]) -> io::Result<()> {
        for shift in &[24, 16, 8, 0] {
            for value in values {
                self.write_u8((value >> shift) as u8)?;
            }
        }

        Ok(())
    }

    fn write_interleaved_f32_array<I>(&mut self, values: I) -> io::Result<()>
    where
        I: Iterator<Item = f32> + Clone,
    {
        for shift in &[24, 16, 8, 0] {
            for value in values.clone() {
                let encoded = encode_f32(value) >> shift;
                self.write_u8(encoded as u8)?;
            }
        }

        Ok(())
    }

    fn write_interleaved_i64_array<I>(&mut self, values: I) -> io::Result<()>
    where
        I: Iterator<Item = i64> + Clone,
    {
        for shift in &[56, 48, 40, 32, 24, 16, 8, 0] {
            for value in values.clone() {
                let encoded = encode_i64(value) >> shift;
                self.write_u8(encoded as u8)?;
            }
        }

        Ok(())
    }

    /// Write a referent list: each value is replaced with its difference
    /// from the previous one, then the list is zigzag-encoded and
    /// byte-interleaved like any other i32 array.
    fn write_referents<I>(&mut self, values: I) -> io::Result<()>
    where
        I: Iterator<Item = i32>,
    {
        let mut delta_encoded = Vec::new();
        let mut last_value = 0;

        for value in values {
            delta_encoded.push(value.wrapping_sub(last_value));
            last_value = value;
        }

        self.write_interleaved_i32_array(delta_encoded.iter().copied())
    }
}

impl<W: Write> RbxWriteExt for W {}

/// Wraps a reader and counts the bytes pulled through it, so errors can
/// report where in the file they were noticed.
pub(crate) struct CountingReader<R> {
    inner: R,
    bytes_read: u64,
}

impl<R> CountingReader<R> {
    pub fn new(inner: R) -> Self {
        CountingReader {
            inner,
            bytes_read: 0,
        }
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        let count = self.inner.read(buffer)?;
        self.bytes_read += count as u64;
        Ok(count)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zigzag_i32_known_values() {
        assert_eq!(encode_i32(0), 0);
        assert_eq!(encode_i32(-1), 1);
        assert_eq!(encode_i32(1), 2);
        assert_eq!(encode_i32(-2), 3);
        assert_eq!(encode_i32(i32::max_value()) as u32, 0xffff_fffe);
        assert_eq!(encode_i32(i32::min_value()) as u32, 0xffff_ffff);
    }

    #[test]
    fn zigzag_i32_round_trip() {
        for &value in &[0, 1, -1, 42, -37, i32::max_value(), i32::min_value()] {
            assert_eq!(decode_i32(encode_i32(value)), value);
        }
    }

    #[test]
    fn zigzag_i64_round_trip() {
        for &value in &[
            0,
            1,
            -1,
            1_234_567_890_123,
            -987_654_321,
            i64::max_value(),
            i64::min_value(),
        ] {
            assert_eq!(decode_i64(encode_i64(value)), value);
        }
    }

    #[test]
    fn rotated_f32_known_bits() {
        // 1.0f32 is 0x3f800000; rotating the sign bit to the bottom doubles
        // the magnitude bits.
        assert_eq!(encode_f32(1.0), 0x7f00_0000);
        assert_eq!(encode_f32(-1.0), 0x7f00_0001);
    }

    #[test]
    fn rotated_f32_round_trip() {
        for &value in &[0.0f32, 1.0, -1.0, 0.5, -1337.25, std::f32::MIN_POSITIVE] {
            let decoded = decode_f32(encode_f32(value));
            assert_eq!(decoded.to_bits(), value.to_bits());
        }
    }

    #[test]
    fn interleaved_i32_exact_bytes() {
        let mut output = Vec::new();
        output
            .write_interleaved_i32_array([42, -37].iter().copied())
            .unwrap();

        // zigzag(42) = 84 = 0x54, zigzag(-37) = 73 = 0x49; the high-order
        // byte planes come first.
        assert_eq!(output, &[0, 0, 0, 0, 0, 0, 0x54, 0x49]);

        let mut decoded = [0; 2];
        output
            .as_slice()
            .read_interleaved_i32_array(&mut decoded)
            .unwrap();
        assert_eq!(decoded, [42, -37]);
    }

    #[test]
    fn referent_array_exact_bytes() {
        let mut output = Vec::new();
        output.write_referents([5, 7, 4].iter().copied()).unwrap();

        // deltas [5, 2, -3], zigzagged [10, 4, 5], interleaved with the
        // low-order plane last.
        assert_eq!(output, &[0, 0, 0, 0, 0, 0, 0, 0, 0, 0x0a, 0x04, 0x05]);

        let mut decoded = [0; 3];
        output
            .as_slice()
            .read_referent_array(&mut decoded)
            .unwrap();
        assert_eq!(decoded, [5, 7, 4]);
    }

    #[test]
    fn interleaved_u32_round_trip() {
        let values = [0u32, 1, 0xdead_beef, u32::max_value()];

        let mut output = Vec::new();
        output.write_interleaved_u32_array(&values).unwrap();
        assert_eq!(output.len(), 16);

        let mut decoded = [0; 4];
        output
            .as_slice()
            .read_interleaved_u32_array(&mut decoded)
            .unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn interleaved_f32_round_trip() {
        let values = [0.0f32, 1.0, -1.0, 1234.5];

        let mut output = Vec::new();
        output
            .write_interleaved_f32_array(values.iter().copied())
            .unwrap();

        let mut decoded = [0.0; 4];
        output
            .as_slice()
            .read_interleaved_f32_array(&mut decoded)
            .unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn interleaved_i64_round_trip() {
        let values = [0i64, -1, 35_184_372_088_832, -129];

        let mut output = Vec::new();
        output
            .write_interleaved_i64_array(values.iter().copied())
            .unwrap();
        assert_eq!(output.len(), 32);

        let mut decoded = [0; 4];
        output
            .as_slice()
            .read_interleaved_i64_array(&mut decoded)
            .unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn string_round_trip() {
        let mut output = Vec::new();
        output.write_string("Hello, world!").unwrap();
        assert_eq!(&output[..4], &[13, 0, 0, 0]);

        let decoded = output.as_slice().read_string().unwrap();
        assert_eq!(decoded, "Hello, world!");
    }

    #[test]
    fn truncated_string_is_an_error() {
        let input: &[u8] = &[10, 0, 0, 0, b'h', b'i'];
        let err = (&input[..]).read_binary_string().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
