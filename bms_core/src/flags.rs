//! Bitmask decoding for alert, warning and MOSFET status words.

/// Typed view over a 32-bit status word; bit `i` maps to label index `i`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FlagMask(u32);

impl FlagMask {
    pub const WIDTH: usize = u32::BITS as usize;

    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Indices past the word width are never set.
    pub fn is_set(self, index: usize) -> bool {
        index < Self::WIDTH && self.0 & (1u32 << index) != 0
    }

    pub fn active_indices(self) -> impl Iterator<Item = usize> {
        (0..Self::WIDTH).filter(move |&index| self.is_set(index))
    }
}

impl From<u32> for FlagMask {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

impl From<Option<u32>> for FlagMask {
    fn from(bits: Option<u32>) -> Self {
        Self(bits.unwrap_or(0))
    }
}

/// Decoded label set. `NoneActive` is kept distinct from an empty list so the
/// presentation layer can say "none" explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedFlags {
    NoneActive,
    Active(Vec<String>),
}

impl DecodedFlags {
    pub fn labels(&self) -> &[String] {
        match self {
            DecodedFlags::NoneActive => &[],
            DecodedFlags::Active(labels) => labels,
        }
    }

    pub fn is_none_active(&self) -> bool {
        matches!(self, DecodedFlags::NoneActive)
    }
}

/// Labels whose bit is set in `mask`, in table order.
///
/// Set bits without a label and labels beyond the mask width are ignored.
pub fn decode_flags<S: AsRef<str>>(mask: FlagMask, labels: &[S]) -> DecodedFlags {
    let active: Vec<String> = labels
        .iter()
        .enumerate()
        .filter(|(index, _)| mask.is_set(*index))
        .map(|(_, label)| label.as_ref().to_string())
        .collect();
    if active.is_empty() {
        DecodedFlags::NoneActive
    } else {
        DecodedFlags::Active(active)
    }
}
