//! Response decoding.
//!
//! A [`DecodeSpec`] says how one response report should be read: the raw
//! bytes, one byte, a 16/32-bit scalar, or a packed tuple described by a
//! small struct-style format string (`"<BHHHHH"`).
//!
//! Decoding is pure: it only reads the response slice.

use crate::error::{Error, Result};

/// Byte order of multi-byte fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

/// Field width codes of the unpack mini-language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    /// `B`: 1 byte.
    U8,
    /// `H`: 2 bytes.
    U16,
    /// `I`: 4 bytes.
    U32,
    /// `Q`: 8 bytes.
    U64,
}

impl Width {
    pub fn bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
            Self::U64 => 8,
        }
    }

    fn from_code(c: char) -> Option<Self> {
        match c {
            'B' => Some(Self::U8),
            'H' => Some(Self::U16),
            'I' => Some(Self::U32),
            'Q' => Some(Self::U64),
            _ => None,
        }
    }
}

/// Parsed unpack format: an endianness marker and a field list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackFormat {
    pub endian: Endian,
    pub fields: Vec<Width>,
}

impl UnpackFormat {
    /// Parse a format string such as `"<IQ"` or `">HH"`.
    ///
    /// An optional leading `<` (little, the default) or `>` (big) sets the
    /// byte order; every other character must be one of `B`, `H`, `I`, `Q`.
    pub fn parse(format: &str) -> Result<Self> {
        let (endian, body) = match format.chars().next() {
            Some('<') => (Endian::Little, &format[1..]),
            Some('>') => (Endian::Big, &format[1..]),
            _ => (Endian::Little, format),
        };
        let fields = body
            .chars()
            .map(|c| Width::from_code(c).ok_or_else(|| Error::InvalidUnpackFormat(format.into())))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { endian, fields })
    }

    /// Total bytes consumed by one unpack.
    pub fn size(&self) -> usize {
        self.fields.iter().map(|w| w.bytes()).sum()
    }
}

/// How to interpret one response report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DecodeSpec {
    /// Return the report bytes unchanged.
    #[default]
    Raw,
    /// Single byte at `index`.
    Byte { index: usize },
    /// 16-bit integer at `index`.
    U16 { index: usize, endian: Endian },
    /// 32-bit integer at `index`.
    U32 { index: usize, endian: Endian },
    /// Sequential packed fields starting at offset 0.
    Unpack(UnpackFormat),
}

impl DecodeSpec {
    pub fn byte(index: usize) -> Self {
        Self::Byte { index }
    }

    pub fn u16_le(index: usize) -> Self {
        Self::U16 {
            index,
            endian: Endian::Little,
        }
    }

    pub fn u16_be(index: usize) -> Self {
        Self::U16 {
            index,
            endian: Endian::Big,
        }
    }

    pub fn u32_le(index: usize) -> Self {
        Self::U32 {
            index,
            endian: Endian::Little,
        }
    }

    pub fn u32_be(index: usize) -> Self {
        Self::U32 {
            index,
            endian: Endian::Big,
        }
    }

    /// Packed tuple spec from a format string.
    pub fn unpack(format: &str) -> Result<Self> {
        UnpackFormat::parse(format).map(Self::Unpack)
    }
}

/// A decoded response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Bytes(Vec<u8>),
    Byte(u8),
    U16(u16),
    U32(u32),
    Fields(Vec<u64>),
}

impl Decoded {
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Scalar value of a single-value decode.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Self::Byte(b) => Some(b.into()),
            Self::U16(v) => Some(v.into()),
            Self::U32(v) => Some(v.into()),
            _ => None,
        }
    }

    pub fn into_fields(self) -> Option<Vec<u64>> {
        match self {
            Self::Fields(f) => Some(f),
            _ => None,
        }
    }
}

/// Decode `data` according to `spec`.
pub fn decode(data: &[u8], spec: &DecodeSpec) -> Result<Decoded> {
    match spec {
        DecodeSpec::Raw => Ok(Decoded::Bytes(data.to_vec())),
        DecodeSpec::Byte { index } => {
            read_uint(data, *index, 1, Endian::Little).map(|v| Decoded::Byte(v as u8))
        }
        DecodeSpec::U16 { index, endian } => {
            read_uint(data, *index, 2, *endian).map(|v| Decoded::U16(v as u16))
        }
        DecodeSpec::U32 { index, endian } => {
            read_uint(data, *index, 4, *endian).map(|v| Decoded::U32(v as u32))
        }
        DecodeSpec::Unpack(format) => unpack(data, format).map(Decoded::Fields),
    }
}

/// Read every field of `format` sequentially from offset 0.
pub fn unpack(data: &[u8], format: &UnpackFormat) -> Result<Vec<u64>> {
    let mut offset = 0;
    let mut out = Vec::with_capacity(format.fields.len());
    for width in &format.fields {
        out.push(read_uint(data, offset, width.bytes(), format.endian)?);
        offset += width.bytes();
    }
    Ok(out)
}

fn read_uint(data: &[u8], offset: usize, width: usize, endian: Endian) -> Result<u64> {
    let bytes = offset
        .checked_add(width)
        .and_then(|end| data.get(offset..end))
        .ok_or(Error::ShortResponse {
            offset,
            width,
            len: data.len(),
        })?;
    let fold = |acc: u64, &b: &u8| (acc << 8) | u64::from(b);
    Ok(match endian {
        Endian::Big => bytes.iter().fold(0, fold),
        Endian::Little => bytes.iter().rev().fold(0, fold),
    })
}
