use serde::Serialize;
use smallvec::SmallVec;

use crate::base::{TopologyError, TopologyResult};

/// Where an interleaved offset lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BankSlot {
    pub bank: usize,
    /// Bank-width word index inside the bank.
    pub row: u64,
    /// Byte offset inside the bank.
    pub byte_offset: u64,
}

/// Low-order interleave: consecutive bank-width words go to consecutive banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InterleaveMap {
    num_banks: usize,
    interleaving_bits: u32,
}

impl InterleaveMap {
    pub fn new(num_banks: usize, bank_width: u64) -> TopologyResult<Self> {
        if num_banks == 0 || !num_banks.is_power_of_two() {
            return Err(TopologyError::configuration(format!(
                "bank count {num_banks} is not a power of two"
            )));
        }
        if bank_width == 0 || !bank_width.is_power_of_two() {
            return Err(TopologyError::configuration(format!(
                "bank width {bank_width} is not a power of two"
            )));
        }
        Ok(Self {
            num_banks,
            interleaving_bits: bank_width.trailing_zeros(),
        })
    }

    pub fn num_banks(&self) -> usize {
        self.num_banks
    }

    pub fn interleaving_bits(&self) -> u32 {
        self.interleaving_bits
    }

    pub fn bank_width(&self) -> u64 {
        1 << self.interleaving_bits
    }

    /// `offset` is relative to the start of the interleaved window.
    pub fn decode(&self, offset: u64) -> BankSlot {
        let word = offset >> self.interleaving_bits;
        let banks = self.num_banks as u64;
        let row = word / banks;
        let within_word = offset & (self.bank_width() - 1);
        BankSlot {
            bank: (word % banks) as usize,
            row,
            byte_offset: (row << self.interleaving_bits) | within_word,
        }
    }
}

/// Core-facing interleaver: one input per master, one output per bank.
#[derive(Debug, Clone, Serialize)]
pub struct BankInterleaver {
    num_masters: usize,
    map: InterleaveMap,
}

impl BankInterleaver {
    pub fn new(num_masters: usize, map: InterleaveMap) -> Self {
        Self { num_masters, map }
    }

    pub fn num_masters(&self) -> usize {
        self.num_masters
    }

    pub fn map(&self) -> &InterleaveMap {
        &self.map
    }

    pub fn route(&self, master: usize, offset: u64) -> TopologyResult<BankSlot> {
        if master >= self.num_masters {
            return Err(TopologyError::UnknownPort {
                component: "interleaver".to_string(),
                port: format!("in_{master}"),
            });
        }
        Ok(self.map.decode(offset))
    }
}

/// Piece of a bulk transfer that stays inside one bank word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BankChunk {
    pub offset: u64,
    pub size: u64,
    pub slot: BankSlot,
}

pub type BankChunks = SmallVec<[BankChunk; 8]>;

/// Bulk-transfer interleaver feeding the same banks as [`BankInterleaver`] through a single
/// input.
#[derive(Debug, Clone, Serialize)]
pub struct DmaBankInterleaver {
    map: InterleaveMap,
}

impl DmaBankInterleaver {
    pub fn new(map: InterleaveMap) -> Self {
        Self { map }
    }

    pub fn map(&self) -> &InterleaveMap {
        &self.map
    }

    pub fn route(&self, offset: u64) -> BankSlot {
        self.map.decode(offset)
    }

    /// Split `[offset, offset + size)` at bank-word boundaries, in address order.
    pub fn split(&self, offset: u64, size: u64) -> BankChunks {
        let width = self.map.bank_width();
        let mut chunks = BankChunks::new();
        let mut cursor = offset;
        let end = offset.saturating_add(size);
        while cursor < end {
            let word_end = (cursor & !(width - 1)).saturating_add(width);
            let chunk_end = word_end.min(end);
            chunks.push(BankChunk {
                offset: cursor,
                size: chunk_end - cursor,
                slot: self.map.decode(cursor),
            });
            cursor = chunk_end;
        }
        chunks
    }
}
