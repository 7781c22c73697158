//! Copy provenance for statements instantiated via `uses` and `augment`.
//!
//! A statement copied out of a grouping body into a `uses` site, or spliced
//! into an augment target, carries a record of every mechanism that produced
//! it. Nested copies accumulate tags: a grouping body copied into an augment
//! that itself sits under a `uses` ends up tagged with both.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CopyType {
    AddedByUses,
    AddedByAugmentation,
}

impl CopyType {
    fn bit(self) -> u8 {
        match self {
            CopyType::AddedByUses => 0b01,
            CopyType::AddedByAugmentation => 0b10,
        }
    }
}

/// Set of [`CopyType`] tags. The empty set means the statement is original,
/// i.e. it stands exactly where it was declared.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub struct CopyHistory(u8);

impl CopyHistory {
    pub const fn original() -> Self {
        CopyHistory(0)
    }

    pub fn is_original(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, ty: CopyType) -> bool {
        self.0 & ty.bit() != 0
    }

    #[must_use]
    pub fn with(self, ty: CopyType) -> Self {
        CopyHistory(self.0 | ty.bit())
    }

    /// Union of two histories, used when a copy of a copy is made.
    #[must_use]
    pub fn merge(self, other: CopyHistory) -> Self {
        CopyHistory(self.0 | other.0)
    }
}

impl fmt::Display for CopyHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_original() {
            return f.write_str("ORIGINAL");
        }
        let mut first = true;
        for (ty, label) in [
            (CopyType::AddedByUses, "ADDED_BY_USES"),
            (CopyType::AddedByAugmentation, "ADDED_BY_AUGMENTATION"),
        ] {
            if self.contains(ty) {
                if !first {
                    f.write_str("+")?;
                }
                f.write_str(label)?;
                first = false;
            }
        }
        Ok(())
    }
}
