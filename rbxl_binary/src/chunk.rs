use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use lz4::block;

/// Whether a chunk's payload is stored LZ4-compressed or raw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkCompression {
    /// Payload is compressed with raw LZ4 block encoding. The uncompressed
    /// length is carried by the chunk header, not by the LZ4 stream.
    Compressed,

    /// Payload is written as-is.
    Uncompressed,
}

/// One chunk read out of a binary file, with its payload already
/// decompressed. This is the only layer that knows about compression.
#[derive(Debug)]
pub struct Chunk {
    pub name: [u8; 4],
    pub compression: ChunkCompression,
    pub data: Vec<u8>,
}

impl Chunk {
    pub fn decode<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut name = [0; 4];
        reader.read_exact(&mut name)?;

        let compressed_length = reader.read_u32::<LittleEndian>()?;
        let length = reader.read_u32::<LittleEndian>()?;

        let mut reserved = [0; 4];
        reader.read_exact(&mut reserved)?;

        let (compression, data) = if compressed_length == 0 {
            let mut data = vec![0; length as usize];
            reader.read_exact(&mut data)?;

            (ChunkCompression::Uncompressed, data)
        } else {
            let mut compressed = vec![0; compressed_length as usize];
            reader.read_exact(&mut compressed)?;

            let data = block::decompress(&compressed, Some(length as i32))?;

            if data.len() != length as usize {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "chunk decompressed to {} bytes, but its header declared {}",
                        data.len(),
                        length
                    ),
                ));
            }

            (ChunkCompression::Compressed, data)
        };

        Ok(Chunk {
            name,
            compression,
            data,
        })
    }
}

/// Accumulates the payload of one chunk, then writes the framed and
/// optionally compressed result to the output in one shot.
pub struct ChunkBuilder {
    name: [u8; 4],
    compression: ChunkCompression,
    buffer: Vec<u8>,
}

impl ChunkBuilder {
    /// Start a new chunk with the given four-byte name.
    pub fn new(name: &[u8], compression: ChunkCompression) -> Self {
        let mut chunk_name = [0; 4];
        chunk_name.copy_from_slice(name);

        ChunkBuilder {
            name: chunk_name,
            compression,
            buffer: Vec::new(),
        }
    }

    /// Frame the accumulated payload and write it to `output`.
    pub fn dump<W: Write>(self, output: &mut W) -> io::Result<()> {
        output.write_all(&self.name)?;

        match self.compression {
            ChunkCompression::Compressed => {
                let compressed = block::compress(&self.buffer, None, false)?;

                output.write_u32::<LittleEndian>(compressed.len() as u32)?;
                output.write_u32::<LittleEndian>(self.buffer.len() as u32)?;
                output.write_u32::<LittleEndian>(0)?;
                output.write_all(&compressed)?;
            }
            ChunkCompression::Uncompressed => {
                output.write_u32::<LittleEndian>(0)?;
                output.write_u32::<LittleEndian>(self.buffer.len() as u32)?;
                output.write_u32::<LittleEndian>(0)?;
                output.write_all(&self.buffer)?;
            }
        }

        Ok(())
    }
}

impl Write for ChunkBuilder {
    fn write(&mut self, buffer: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buffer);
        Ok(buffer.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::core::RbxWriteExt;

    #[test]
    fn compressed_round_trip() {
        let mut builder = ChunkBuilder::new(b"INST", ChunkCompression::Compressed);
        for _ in 0..64 {
            builder.write_string("a repetitive payload").unwrap();
        }

        let mut output = Vec::new();
        builder.dump(&mut output).unwrap();

        let chunk = Chunk::decode(output.as_slice()).unwrap();
        assert_eq!(&chunk.name, b"INST");
        assert_eq!(chunk.compression, ChunkCompression::Compressed);
        assert_eq!(chunk.data.len(), 64 * 24);
    }

    #[test]
    fn uncompressed_round_trip() {
        let mut builder = ChunkBuilder::new(b"END\0", ChunkCompression::Uncompressed);
        builder.write_all(b"</roblox>").unwrap();

        let mut output = Vec::new();
        builder.dump(&mut output).unwrap();

        // name, zero compressed length, real length, reserved, payload
        assert_eq!(&output[..4], b"END\0");
        assert_eq!(&output[4..8], &[0, 0, 0, 0]);
        assert_eq!(&output[8..12], &[9, 0, 0, 0]);
        assert_eq!(&output[12..16], &[0, 0, 0, 0]);
        assert_eq!(&output[16..], b"</roblox>");

        let chunk = Chunk::decode(output.as_slice()).unwrap();
        assert_eq!(chunk.compression, ChunkCompression::Uncompressed);
        assert_eq!(chunk.data, b"</roblox>");
    }

    #[test]
    fn truncated_chunk_is_an_error() {
        let mut builder = ChunkBuilder::new(b"PROP", ChunkCompression::Uncompressed);
        builder.write_all(b"some bytes").unwrap();

        let mut output = Vec::new();
        builder.dump(&mut output).unwrap();
        output.truncate(output.len() - 4);

        assert!(Chunk::decode(output.as_slice()).is_err());
    }
}
