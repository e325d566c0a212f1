use crate::recency::RecencyTracker;
use crate::store::CacheStore;
use std::error::Error;
use std::fmt;

/// Width of a simulated address in bits.
pub const ADDRESS_BITS: u32 = u64::BITS;

/// Largest block is 4 GiB, keeping the byte counters far from `u64::MAX`.
pub const MAX_BLOCK_BITS: u32 = 32;

/// Shape of the simulated cache: `2^s` sets of `E` lines holding `2^b` byte blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    set_bits: u32,
    block_bits: u32,
    associativity: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    ZeroAssociativity,
    AddressWidthExceeded { set_bits: u32, block_bits: u32 },
    BlockTooLarge { block_bits: u32 },
    TooManyLines { set_bits: u32, associativity: usize },
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryError::ZeroAssociativity => write!(f, "associativity must be at least 1"),
            GeometryError::AddressWidthExceeded {
                set_bits,
                block_bits,
            } => write!(
                f,
                "s={} and b={} do not fit a {}-bit address",
                set_bits, block_bits, ADDRESS_BITS
            ),
            GeometryError::BlockTooLarge { block_bits } => write!(
                f,
                "b={} exceeds the largest supported block (b={})",
                block_bits, MAX_BLOCK_BITS
            ),
            GeometryError::TooManyLines {
                set_bits,
                associativity,
            } => write!(
                f,
                "2^{} sets of {} lines cannot be allocated",
                set_bits, associativity
            ),
        }
    }
}

impl Error for GeometryError {}

// Bytes held by the slot grid plus the recency links, if every
// allocation stays within isize::MAX.
fn grid_bytes(set_bits: u32, associativity: usize) -> Option<usize> {
    let num_sets = 1usize.checked_shl(set_bits)?;
    let lines = num_sets.checked_mul(associativity)?;
    let per_line = CacheStore::SLOT_BYTES + RecencyTracker::LINK_BYTES;
    let bytes = lines
        .checked_mul(per_line)?
        .checked_add(num_sets.checked_mul(RecencyTracker::SET_BYTES)?)?;
    (bytes <= isize::MAX as usize).then_some(bytes)
}

impl Geometry {
    pub fn new(
        set_bits: u32,
        block_bits: u32,
        associativity: usize,
    ) -> Result<Self, GeometryError> {
        if associativity == 0 {
            return Err(GeometryError::ZeroAssociativity);
        }
        if set_bits >= ADDRESS_BITS
            || block_bits >= ADDRESS_BITS
            || set_bits + block_bits > ADDRESS_BITS
        {
            return Err(GeometryError::AddressWidthExceeded {
                set_bits,
                block_bits,
            });
        }
        if block_bits > MAX_BLOCK_BITS {
            return Err(GeometryError::BlockTooLarge { block_bits });
        }
        if grid_bytes(set_bits, associativity).is_none() {
            return Err(GeometryError::TooManyLines {
                set_bits,
                associativity,
            });
        }

        Ok(Geometry {
            set_bits,
            block_bits,
            associativity,
        })
    }

    pub fn set_bits(&self) -> u32 {
        self.set_bits
    }

    pub fn block_bits(&self) -> u32 {
        self.block_bits
    }

    pub fn associativity(&self) -> usize {
        self.associativity
    }

    pub fn num_sets(&self) -> usize {
        1 << self.set_bits
    }

    /// Block size in bytes, also the unit of all dirty-byte accounting.
    pub fn block_size(&self) -> u64 {
        1 << self.block_bits
    }

    pub fn num_lines(&self) -> usize {
        self.num_sets() * self.associativity
    }

    /// Splits a byte address into `(set_index, tag)`.
    pub fn decode(&self, address: u64) -> (usize, u64) {
        let set_mask = (1u64 << self.set_bits) - 1;
        let set_index = ((address >> self.block_bits) & set_mask) as usize;
        // s + b may be the full address width, leaving no tag bits
        let tag = address
            .checked_shr(self.set_bits + self.block_bits)
            .unwrap_or(0);
        (set_index, tag)
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "s={}, b={}, E={} ({} sets, {}B blocks)",
            self.set_bits,
            self.block_bits,
            self.associativity,
            self.num_sets(),
            self.block_size()
        )
    }
}
