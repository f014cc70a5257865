//! Chunk Image Loader
//!
//! Reads and writes the binary chunk image. The loader performs structural
//! validation only; opcode bytes are carried through undecoded and left
//! to the VM.

use crate::bytecode::{Chunk, Constant, Instruction};
use crate::error::{SvmError, SvmResult};

/// Chunk image magic: "SVMC"
pub const IMAGE_MAGIC: u32 = 0x5356_4D43;

/// Supported image version
const VERSION_MAJOR: u8 = 1;
const VERSION_MINOR: u8 = 0;

/// Header (magic + version) plus the two section counts
const MIN_IMAGE_SIZE: usize = 16;

const TAG_NIL: u8 = 0x00;
const TAG_BOOL: u8 = 0x01;
const TAG_INT: u8 = 0x02;
const TAG_DOUBLE: u8 = 0x03;
const TAG_STR: u8 = 0x04;

/// Chunk image loader
pub struct ChunkLoader;

impl ChunkLoader {
    /// True if `bytes` begin with the image magic
    pub fn is_image(bytes: &[u8]) -> bool {
        bytes.len() >= 4 && bytes[..4] == IMAGE_MAGIC.to_be_bytes()
    }

    /// Load a chunk from raw bytes
    pub fn load(bytes: &[u8]) -> SvmResult<Chunk> {
        if bytes.len() < MIN_IMAGE_SIZE {
            return Err(SvmError::ImageTooShort);
        }

        let mut cursor = 0;

        // Magic
        let magic = Self::read_u32(bytes, &mut cursor)?;
        if magic != IMAGE_MAGIC {
            return Err(SvmError::InvalidMagicNumber);
        }

        // Version
        let major = Self::read_u8(bytes, &mut cursor)?;
        let _minor = Self::read_u8(bytes, &mut cursor)?;
        let _patch = Self::read_u8(bytes, &mut cursor)?;
        if major != VERSION_MAJOR {
            return Err(SvmError::InvalidImageVersion);
        }

        // Reserved
        Self::read_u8(bytes, &mut cursor)?;

        let mut chunk = Chunk::new();

        // Constants
        let constant_count = Self::read_u32(bytes, &mut cursor)?;
        for _ in 0..constant_count {
            chunk.add_constant(Self::read_constant(bytes, &mut cursor)?);
        }

        // Instructions
        let instruction_count = Self::read_u32(bytes, &mut cursor)?;
        for _ in 0..instruction_count {
            let opcode = Self::read_u8(bytes, &mut cursor)?;
            let operand = Self::read_u32(bytes, &mut cursor)? as i32;
            let line = Self::read_u32(bytes, &mut cursor)?;
            chunk.write(Instruction::raw(opcode, operand), line);
        }

        if cursor != bytes.len() {
            return Err(SvmError::MalformedImage);
        }

        Ok(chunk)
    }

    fn read_constant(bytes: &[u8], cursor: &mut usize) -> SvmResult<Constant> {
        let tag = Self::read_u8(bytes, cursor)?;

        match tag {
            TAG_NIL => Ok(Constant::Nil),
            TAG_BOOL => {
                let b = Self::read_u8(bytes, cursor)?;
                Ok(Constant::Bool(b != 0))
            }
            TAG_INT => {
                let raw = Self::read_array::<8>(bytes, cursor)?;
                Ok(Constant::Int(i64::from_be_bytes(raw)))
            }
            TAG_DOUBLE => {
                let raw = Self::read_array::<8>(bytes, cursor)?;
                Ok(Constant::Double(f64::from_be_bytes(raw)))
            }
            TAG_STR => {
                let len = Self::read_u32(bytes, cursor)? as usize;
                let raw = Self::read_slice(bytes, cursor, len)?;
                let text = std::str::from_utf8(raw).map_err(|_| SvmError::MalformedImage)?;
                Ok(Constant::Str(text.into()))
            }
            _ => Err(SvmError::MalformedImage),
        }
    }

    fn read_u8(bytes: &[u8], cursor: &mut usize) -> SvmResult<u8> {
        let [b] = Self::read_array::<1>(bytes, cursor)?;
        Ok(b)
    }

    fn read_u32(bytes: &[u8], cursor: &mut usize) -> SvmResult<u32> {
        Ok(u32::from_be_bytes(Self::read_array::<4>(bytes, cursor)?))
    }

    fn read_array<const N: usize>(bytes: &[u8], cursor: &mut usize) -> SvmResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(Self::read_slice(bytes, cursor, N)?);
        Ok(out)
    }

    fn read_slice<'a>(bytes: &'a [u8], cursor: &mut usize, len: usize) -> SvmResult<&'a [u8]> {
        let end = cursor.checked_add(len).ok_or(SvmError::ImageTooShort)?;
        let slice = bytes.get(*cursor..end).ok_or(SvmError::ImageTooShort)?;
        *cursor = end;
        Ok(slice)
    }
}

/// Chunk image writer
pub struct ChunkWriter;

impl ChunkWriter {
    /// Serialize `chunk` into the image format `ChunkLoader` reads
    pub fn write(chunk: &Chunk) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend(IMAGE_MAGIC.to_be_bytes());
        buf.push(VERSION_MAJOR);
        buf.push(VERSION_MINOR);
        buf.push(0u8); // patch
        buf.push(0u8); // reserved

        buf.extend((chunk.constants().len() as u32).to_be_bytes());
        for constant in chunk.constants() {
            match constant {
                Constant::Nil => buf.push(TAG_NIL),
                Constant::Bool(b) => {
                    buf.push(TAG_BOOL);
                    buf.push(u8::from(*b));
                }
                Constant::Int(i) => {
                    buf.push(TAG_INT);
                    buf.extend(i.to_be_bytes());
                }
                Constant::Double(d) => {
                    buf.push(TAG_DOUBLE);
                    buf.extend(d.to_be_bytes());
                }
                Constant::Str(text) => {
                    buf.push(TAG_STR);
                    buf.extend((text.len() as u32).to_be_bytes());
                    buf.extend(text.as_bytes());
                }
            }
        }

        buf.extend((chunk.len() as u32).to_be_bytes());
        for (instr, line) in chunk.code().iter().zip(chunk.lines()) {
            buf.push(instr.opcode);
            buf.extend(instr.operand.to_be_bytes());
            buf.extend(line.to_be_bytes());
        }

        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::OpCode;

    fn header() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend(&IMAGE_MAGIC.to_be_bytes());
        buf.push(1u8); buf.push(0u8); buf.push(0u8); buf.push(0u8);
        buf
    }

    #[test]
    fn loads_hand_built_image() {
        let mut buf = header();
        // 2 constants: int 7, str "ok"
        buf.extend(&2u32.to_be_bytes());
        buf.push(TAG_INT); buf.extend(&7i64.to_be_bytes());
        buf.push(TAG_STR); buf.extend(&2u32.to_be_bytes()); buf.extend(b"ok");
        // 2 instructions
        buf.extend(&2u32.to_be_bytes());
        buf.push(OpCode::Push as u8); buf.extend(&1i32.to_be_bytes()); buf.extend(&4u32.to_be_bytes());
        buf.push(0x99); buf.extend(&(-3i32).to_be_bytes()); buf.extend(&5u32.to_be_bytes());

        let chunk = ChunkLoader::load(&buf).expect("load failed");
        assert_eq!(chunk.constants(), &[Constant::Int(7), Constant::Str("ok".into())]);
        assert_eq!(chunk.instruction(0), Some(&Instruction::with_operand(OpCode::Push, 1)));
        // unknown opcode bytes are not rejected here
        assert_eq!(chunk.instruction(1), Some(&Instruction::raw(0x99, -3)));
        assert_eq!(chunk.lines(), &[4, 5]);
    }

    #[test]
    fn written_image_loads_back() {
        let mut chunk = Chunk::new();
        chunk.add_constant(Constant::Double(-0.25));
        chunk.add_constant(Constant::Bool(true));
        chunk.add_constant(Constant::Nil);
        chunk.write(Instruction::with_operand(OpCode::Jmp, 2), 1);
        chunk.write(Instruction::new(OpCode::Halt), 2);

        let bytes = ChunkWriter::write(&chunk);
        assert!(ChunkLoader::is_image(&bytes));
        let loaded = ChunkLoader::load(&bytes).expect("load failed");
        assert_eq!(loaded.constants(), chunk.constants());
        assert_eq!(loaded.code(), chunk.code());
        assert_eq!(loaded.lines(), chunk.lines());
    }

    #[test]
    fn rejects_bad_headers() {
        assert_eq!(ChunkLoader::load(&[0u8; 4]).map(|_| ()), Err(SvmError::ImageTooShort));

        let mut buf = vec![0u8; 16];
        buf[..4].copy_from_slice(b"NOPE");
        assert_eq!(ChunkLoader::load(&buf).map(|_| ()), Err(SvmError::InvalidMagicNumber));

        let mut buf = header();
        buf[4] = 9;
        buf.extend(&[0u8; 8]);
        assert_eq!(ChunkLoader::load(&buf).map(|_| ()), Err(SvmError::InvalidImageVersion));
    }

    #[test]
    fn rejects_truncated_and_malformed_sections() {
        let mut buf = header();
        buf.extend(&0u32.to_be_bytes());
        buf.extend(&1u32.to_be_bytes());
        buf.push(OpCode::Halt as u8); // operand and line missing
        assert_eq!(ChunkLoader::load(&buf).map(|_| ()), Err(SvmError::ImageTooShort));

        let mut buf = header();
        buf.extend(&1u32.to_be_bytes());
        buf.push(0x7F); // unknown constant tag
        buf.extend(&0u32.to_be_bytes());
        assert_eq!(ChunkLoader::load(&buf).map(|_| ()), Err(SvmError::MalformedImage));

        let mut buf = header();
        buf.extend(&1u32.to_be_bytes());
        buf.push(TAG_STR); buf.extend(&2u32.to_be_bytes()); buf.extend(&[0xFF, 0xFE]);
        buf.extend(&0u32.to_be_bytes());
        assert_eq!(ChunkLoader::load(&buf).map(|_| ()), Err(SvmError::MalformedImage));

        let mut buf = header();
        buf.extend(&0u32.to_be_bytes());
        buf.extend(&0u32.to_be_bytes());
        buf.push(0u8); // trailing garbage
        assert_eq!(ChunkLoader::load(&buf).map(|_| ()), Err(SvmError::MalformedImage));
    }
}
