/// Marker byte written in front of every reference-typed slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefMarker {
    /// No object.
    Null,
    /// An object that isn't reference-tracked; its data follows.
    Value,
    /// First sight of a tracked object; its index and then its data follow.
    New,
    /// An object already written in this call; only its index follows.
    BackRef,
}

impl RefMarker {
    /// Construct a marker from a single byte. Returns `None` for unknown bytes.
    pub fn from_u8(n: u8) -> Option<RefMarker> {
        match n {
            0 => Some(RefMarker::Null),
            1 => Some(RefMarker::Value),
            2 => Some(RefMarker::New),
            3 => Some(RefMarker::BackRef),
            _ => None,
        }
    }

    pub fn into_u8(self) -> u8 {
        match self {
            RefMarker::Null => 0,
            RefMarker::Value => 1,
            RefMarker::New => 2,
            RefMarker::BackRef => 3,
        }
    }
}

impl From<RefMarker> for u8 {
    fn from(val: RefMarker) -> u8 {
        val.into_u8()
    }
}

/// Leading varint of a class-tagged object. Values from [`ClassTag::FIRST_ID`] upward are
/// registry ids offset by that amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassTag {
    Null,
    /// The type name follows as a string. Used for implicitly registered types.
    Name,
    Id(u32),
}

impl ClassTag {
    pub const FIRST_ID: u32 = 2;

    pub fn from_u32(n: u32) -> ClassTag {
        match n {
            0 => ClassTag::Null,
            1 => ClassTag::Name,
            n => ClassTag::Id(n - Self::FIRST_ID),
        }
    }

    pub fn into_u32(self) -> u32 {
        match self {
            ClassTag::Null => 0,
            ClassTag::Name => 1,
            ClassTag::Id(id) => id + Self::FIRST_ID,
        }
    }
}
