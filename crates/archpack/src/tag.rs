/// Identifies the shape of the next encoded item.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    True = 0x01,
    False = 0x02,
    U8 = 0x03,
    U16 = 0x04,
    U32 = 0x05,
    U64 = 0x06,
    I8 = 0x07,
    I16 = 0x08,
    I32 = 0x09,
    I64 = 0x0A,
    F32 = 0x0B,
    F64 = 0x0C,
    /// A machine address, always carried as 8 bytes regardless of the writer's pointer width.
    Addr = 0x0D,
    Unit = 0x0E,
    None = 0x0F,

    Str = 0x10,

    List = 0x20,
    Map = 0x21,

    Some = 0x30,
    Ok = 0x31,
    Err = 0x32,
    Variant = 0x33,
}

impl Tag {
    pub fn from_u8(b: u8) -> Option<Self> {
        let tag = match b {
            0x01 => Tag::True,
            0x02 => Tag::False,
            0x03 => Tag::U8,
            0x04 => Tag::U16,
            0x05 => Tag::U32,
            0x06 => Tag::U64,
            0x07 => Tag::I8,
            0x08 => Tag::I16,
            0x09 => Tag::I32,
            0x0A => Tag::I64,
            0x0B => Tag::F32,
            0x0C => Tag::F64,
            0x0D => Tag::Addr,
            0x0E => Tag::Unit,
            0x0F => Tag::None,
            0x10 => Tag::Str,
            0x20 => Tag::List,
            0x21 => Tag::Map,
            0x30 => Tag::Some,
            0x31 => Tag::Ok,
            0x32 => Tag::Err,
            0x33 => Tag::Variant,
            _ => return None,
        };
        Some(tag)
    }

    /// Size of the fixed payload that follows the tag, or `None` for
    /// length-prefixed items.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            Tag::True | Tag::False | Tag::Unit | Tag::None => Some(0),
            Tag::U8 | Tag::I8 => Some(1),
            Tag::U16 | Tag::I16 => Some(2),
            Tag::U32 | Tag::I32 | Tag::F32 => Some(4),
            Tag::U64 | Tag::I64 | Tag::F64 | Tag::Addr => Some(8),
            Tag::Str | Tag::List | Tag::Map | Tag::Some | Tag::Ok | Tag::Err | Tag::Variant => None,
        }
    }
}

/// Open container kinds tracked by the `Encoder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Top level; accepts any number of items.
    Root,
    /// Accepts any number of items.
    List,
    /// Accepts only variants (key/value entries).
    Map,
    /// Exactly one item.
    Option,
    /// Exactly one item.
    Result,
    /// Exactly one payload item after the name.
    Variant,
}

impl Scope {
    pub(crate) fn is_strict(self) -> bool {
        matches!(self, Scope::Option | Scope::Result | Scope::Variant)
    }
}
