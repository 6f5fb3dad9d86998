// Word decoding works on f64 magnitudes rather than fixed-width integers:
// each byte contributes byte * 256^k and the sign is applied by subtracting
// 256^L. That keeps one code path for every width, at the cost of exactness
// for 64-bit words above 2^53.

/// Width of a fixed-size word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Width {
    W8,
    W16,
    W32,
    W64,
}

impl Width {
    /// All widths, narrowest first.
    pub const ALL: [Width; 4] = [Width::W8, Width::W16, Width::W32, Width::W64];

    /// Number of bytes a word of this width occupies.
    #[must_use]
    pub fn bytes(self) -> usize {
        match self {
            Width::W8 => 1,
            Width::W16 => 2,
            Width::W32 => 4,
            Width::W64 => 8,
        }
    }

    #[must_use]
    pub fn bits(self) -> usize {
        self.bytes() * 8
    }
}

/// Byte order used to assemble a multi-byte word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endian {
    /// Least-significant byte first.
    Little,
    /// Most-significant byte first.
    Big,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Signedness {
    Unsigned,
    /// Two's complement, applied by magnitude arithmetic.
    Signed,
}

/// One word decode operation: a (width, endianness, signedness) triple.
///
/// For 8-bit words endianness cannot matter, so [`WordOp::new`] folds both
/// byte orders onto the big-endian variant. `WordOp::new(W8, Little, s)`
/// and `WordOp::new(W8, Big, s)` compare equal.
///
/// ```text
/// ┌───────┬────────────────────┬──────────┬──────────┐
/// │ Width │ LE unsigned        │ LE signed│ BE ...   │
/// ├───────┼────────────────────┼──────────┼──────────┤
/// │ 8     │ word8 / word8u     │ word8s   │ (alias)  │
/// │ 16    │ word16le / word16lu│ word16ls │ word16be │
/// │ 32    │ word32le / word32lu│ word32ls │ word32be │
/// │ 64    │ word64le / word64lu│ word64ls │ word64be │
/// └───────┴────────────────────┴──────────┴──────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WordOp {
    width: Width,
    endian: Endian,
    signedness: Signedness,
}

impl WordOp {
    pub const U8: Self = Self::new(Width::W8, Endian::Big, Signedness::Unsigned);
    pub const S8: Self = Self::new(Width::W8, Endian::Big, Signedness::Signed);
    pub const U16_LE: Self = Self::new(Width::W16, Endian::Little, Signedness::Unsigned);
    pub const S16_LE: Self = Self::new(Width::W16, Endian::Little, Signedness::Signed);
    pub const U16_BE: Self = Self::new(Width::W16, Endian::Big, Signedness::Unsigned);
    pub const S16_BE: Self = Self::new(Width::W16, Endian::Big, Signedness::Signed);
    pub const U32_LE: Self = Self::new(Width::W32, Endian::Little, Signedness::Unsigned);
    pub const S32_LE: Self = Self::new(Width::W32, Endian::Little, Signedness::Signed);
    pub const U32_BE: Self = Self::new(Width::W32, Endian::Big, Signedness::Unsigned);
    pub const S32_BE: Self = Self::new(Width::W32, Endian::Big, Signedness::Signed);
    pub const U64_LE: Self = Self::new(Width::W64, Endian::Little, Signedness::Unsigned);
    pub const S64_LE: Self = Self::new(Width::W64, Endian::Little, Signedness::Signed);
    pub const U64_BE: Self = Self::new(Width::W64, Endian::Big, Signedness::Unsigned);
    pub const S64_BE: Self = Self::new(Width::W64, Endian::Big, Signedness::Signed);

    /// Every distinct operation (the 8-bit aliases appear once).
    pub const ALL: [WordOp; 14] = [
        Self::U8,
        Self::S8,
        Self::U16_LE,
        Self::S16_LE,
        Self::U16_BE,
        Self::S16_BE,
        Self::U32_LE,
        Self::S32_LE,
        Self::U32_BE,
        Self::S32_BE,
        Self::U64_LE,
        Self::S64_LE,
        Self::U64_BE,
        Self::S64_BE,
    ];

    /// Build an operation, folding 8-bit endianness onto big-endian.
    #[must_use]
    pub const fn new(width: Width, endian: Endian, signedness: Signedness) -> Self {
        let endian = match width {
            Width::W8 => Endian::Big,
            _ => endian,
        };
        Self {
            width,
            endian,
            signedness,
        }
    }

    #[must_use]
    pub fn width(self) -> Width {
        self.width
    }

    #[must_use]
    pub fn endian(self) -> Endian {
        self.endian
    }

    #[must_use]
    pub fn signedness(self) -> Signedness {
        self.signedness
    }

    /// Bytes consumed by one read of this word.
    #[must_use]
    pub fn size(self) -> usize {
        self.width.bytes()
    }

    /// Decode `bytes` under this operation.
    ///
    /// The slice is normally exactly [`size`](Self::size) bytes long, but
    /// any length is accepted: a truncated read at the end of a buffer
    /// decodes whatever bytes are there, and an empty slice decodes to 0.
    ///
    /// 64-bit words are accumulated in `f64`; values beyond 2^53 in
    /// magnitude are rounded.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> f64 {
        match (self.endian, self.signedness) {
            (Endian::Little, Signedness::Unsigned) => decode_le_unsigned(bytes),
            (Endian::Little, Signedness::Signed) => decode_le_signed(bytes),
            (Endian::Big, Signedness::Unsigned) => decode_be_unsigned(bytes),
            (Endian::Big, Signedness::Signed) => decode_be_signed(bytes),
        }
    }

    /// Canonical DSL name, e.g. `word16le`, `word32bs`, `word8`, `word8s`.
    #[must_use]
    pub fn name(self) -> &'static str {
        NAMES
            .iter()
            .find(|(_, op)| *op == self)
            .map_or("word?", |(name, _)| name)
    }

    /// Look up an operation by any of its DSL names, aliases included.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        NAMES
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, op)| *op)
    }

    /// The full name table, canonical names listed before their aliases.
    #[must_use]
    pub fn names() -> &'static [(&'static str, WordOp)] {
        NAMES
    }
}

/// Name table for the DSL. The first entry for each operation is its
/// canonical name.
const NAMES: &[(&str, WordOp)] = &[
    ("word8", WordOp::U8),
    ("word8u", WordOp::U8),
    ("word8be", WordOp::U8),
    ("word8bu", WordOp::U8),
    ("word8le", WordOp::U8),
    ("word8lu", WordOp::U8),
    ("word8s", WordOp::S8),
    ("word8bs", WordOp::S8),
    ("word8ls", WordOp::S8),
    ("word16le", WordOp::U16_LE),
    ("word16lu", WordOp::U16_LE),
    ("word16ls", WordOp::S16_LE),
    ("word16be", WordOp::U16_BE),
    ("word16bu", WordOp::U16_BE),
    ("word16bs", WordOp::S16_BE),
    ("word32le", WordOp::U32_LE),
    ("word32lu", WordOp::U32_LE),
    ("word32ls", WordOp::S32_LE),
    ("word32be", WordOp::U32_BE),
    ("word32bu", WordOp::U32_BE),
    ("word32bs", WordOp::S32_BE),
    ("word64le", WordOp::U64_LE),
    ("word64lu", WordOp::U64_LE),
    ("word64ls", WordOp::S64_LE),
    ("word64be", WordOp::U64_BE),
    ("word64bu", WordOp::U64_BE),
    ("word64bs", WordOp::S64_BE),
];

/// 256^len as f64.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn radix_pow(len: usize) -> f64 {
    256f64.powi(len as i32)
}

/// Unsigned little-endian: `Σ byte[i] · 256^i`.
#[must_use]
pub fn decode_le_unsigned(bytes: &[u8]) -> f64 {
    bytes
        .iter()
        .enumerate()
        .map(|(i, &b)| radix_pow(i) * f64::from(b))
        .sum()
}

/// Unsigned big-endian: `Σ byte[i] · 256^(L-1-i)`.
#[must_use]
pub fn decode_be_unsigned(bytes: &[u8]) -> f64 {
    let len = bytes.len();
    bytes
        .iter()
        .enumerate()
        .map(|(i, &b)| radix_pow(len - i - 1) * f64::from(b))
        .sum()
}

/// Signed big-endian. The sign bit lives in the first byte.
#[must_use]
pub fn decode_be_signed(bytes: &[u8]) -> f64 {
    let value = decode_be_unsigned(bytes);
    match bytes.first() {
        Some(&msb) if msb & 0x80 == 0x80 => value - radix_pow(bytes.len()),
        _ => value,
    }
}

/// Signed little-endian. The sign bit lives in the last byte.
#[must_use]
pub fn decode_le_signed(bytes: &[u8]) -> f64 {
    let value = decode_le_unsigned(bytes);
    match bytes.last() {
        Some(&msb) if msb & 0x80 == 0x80 => value - radix_pow(bytes.len()),
        _ => value,
    }
}
