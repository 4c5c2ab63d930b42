//! Per-(kind, encoding) decode/encode routines. Text decode/encode operate
//! on an already-tokenized word; binary decode/encode operate directly on
//! anything implementing `Read`/`Write` (in practice, a `ByteReader`/
//! `ByteWriter`) via `byteorder`'s extension traits — the single binary
//! primitive layer, parameterized by endianness, that both storage modes
//! share.

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use crate::error::{PlyError, Result};
use crate::types::ScalarKind;

fn io_to_ply(e: io::Error) -> PlyError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        PlyError::Eof {
            context: "a binary value",
        }
    } else {
        PlyError::IOError(e)
    }
}

/// Parse a whitespace-delimited token as `kind`, widened to `f64`.
pub fn decode_ascii(token: &str, kind: ScalarKind) -> Result<f64> {
    use ScalarKind::*;
    let bad_int = || PlyError::BadInteger {
        token: token.to_string(),
    };
    let bad_float = || PlyError::BadFloat {
        token: token.to_string(),
    };
    Ok(match kind {
        I8 => token.parse::<i8>().map_err(|_| bad_int())? as f64,
        U8 => token.parse::<u8>().map_err(|_| bad_int())? as f64,
        I16 => token.parse::<i16>().map_err(|_| bad_int())? as f64,
        U16 => token.parse::<u16>().map_err(|_| bad_int())? as f64,
        I32 => token.parse::<i32>().map_err(|_| bad_int())? as f64,
        U32 => token.parse::<u32>().map_err(|_| bad_int())? as f64,
        F32 => token.parse::<f32>().map_err(|_| bad_float())? as f64,
        F64 => token.parse::<f64>().map_err(|_| bad_float())?,
    })
}

/// Render `value` (already widened from some source representation) as the
/// minimal round-trippable text for `kind`, clamping/rounding first.
pub fn encode_ascii(value: f64, kind: ScalarKind) -> String {
    use ScalarKind::*;
    let clamped = kind.clamp(value);
    match kind {
        I8 => format!("{}", clamped as i8),
        U8 => format!("{}", clamped as u8),
        I16 => format!("{}", clamped as i16),
        U16 => format!("{}", clamped as u16),
        I32 => format!("{}", clamped as i32),
        U32 => format!("{}", clamped as u32),
        F32 => format!("{}", clamped as f32),
        F64 => format!("{}", clamped),
    }
}

/// Decode one binary value of `kind` from `reader`, swapping byte order
/// when `big_endian` doesn't match the host.
pub fn decode_binary<R: Read>(reader: &mut R, big_endian: bool, kind: ScalarKind) -> Result<f64> {
    use ScalarKind::*;
    macro_rules! read_as {
        ($method:ident) => {
            if big_endian {
                reader.$method::<BigEndian>().map_err(io_to_ply)? as f64
            } else {
                reader.$method::<LittleEndian>().map_err(io_to_ply)? as f64
            }
        };
    }
    Ok(match kind {
        I8 => reader.read_i8().map_err(io_to_ply)? as f64,
        U8 => reader.read_u8().map_err(io_to_ply)? as f64,
        I16 => read_as!(read_i16),
        U16 => read_as!(read_u16),
        I32 => read_as!(read_i32),
        U32 => read_as!(read_u32),
        F32 => read_as!(read_f32),
        F64 => read_as!(read_f64),
    })
}

/// Encode `value` as `kind` to `writer`, clamping/rounding first and
/// swapping byte order when `big_endian` doesn't match the host.
pub fn encode_binary<W: Write>(
    writer: &mut W,
    big_endian: bool,
    kind: ScalarKind,
    value: f64,
) -> Result<()> {
    use ScalarKind::*;
    let clamped = kind.clamp(value);
    macro_rules! write_as {
        ($method:ident, $cast:ty) => {
            if big_endian {
                writer
                    .$method::<BigEndian>(clamped as $cast)
                    .map_err(io_to_ply)?
            } else {
                writer
                    .$method::<LittleEndian>(clamped as $cast)
                    .map_err(io_to_ply)?
            }
        };
    }
    match kind {
        I8 => writer.write_i8(clamped as i8).map_err(io_to_ply)?,
        U8 => writer.write_u8(clamped as u8).map_err(io_to_ply)?,
        I16 => write_as!(write_i16, i16),
        U16 => write_as!(write_u16, u16),
        I32 => write_as!(write_i32, i32),
        U32 => write_as!(write_u32, u32),
        F32 => write_as!(write_f32, f32),
        F64 => write_as!(write_f64, f64),
    }
    Ok(())
}
