//! This module contains the definition of the memory of an execution context.

use serde::{Deserialize, Serialize};

use crate::{
    constant::{
        GLOBAL_REGION_BASE,
        HEAP_REGION_BASE,
        MIN_ALLOCATION_ALIGN_BYTES,
        STACK_REGION_BASE,
    },
    expr::{Expr, ExprBuilder, Sort},
    layout::align_to,
};

/// A representation of the byte-addressed memory of the program.
///
/// The memory is a single array term from pointer-width addresses to bytes.
/// It is never modified in place: every store builds a new array term on top
/// of the previous one, so the memory term at any point describes the whole
/// history of writes since the context was created.
///
/// Alongside the term the memory keeps a concrete allocator. Globals,
/// functions, stack allocations and heap allocations each receive a fixed,
/// non-overlapping address range in their own region, so that distinct
/// objects are distinct by construction rather than by assumption.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Memory {
    /// The current contents of memory.
    array: Expr,

    /// The width of an address.
    pointer_width: u32,

    /// The next free address in each region.
    next_global: u64,
    next_stack:  u64,
    next_heap:   u64,

    /// Every allocation made so far, in allocation order.
    allocations: Vec<Allocation>,
}

impl Memory {
    /// Constructs a memory whose initial contents are described by `array`.
    ///
    /// # Panics
    ///
    /// Panics if `array` is not an array from addresses to bytes. This is a
    /// programmer bug.
    #[must_use]
    pub fn new(array: Expr) -> Self {
        let Sort::Array { index, element: 8 } = array.sort() else {
            panic!("Memory must be an array of bytes, not {}", array.sort());
        };
        Self {
            array,
            pointer_width: index,
            next_global: GLOBAL_REGION_BASE,
            next_stack: STACK_REGION_BASE,
            next_heap: HEAP_REGION_BASE,
            allocations: Vec::new(),
        }
    }

    /// Gets the term describing the current contents of memory.
    #[must_use]
    pub fn array(&self) -> &Expr {
        &self.array
    }

    /// Gets the width of an address in bits.
    #[must_use]
    pub fn pointer_width(&self) -> u32 {
        self.pointer_width
    }

    /// Reserves `size` bytes aligned to `align` in `region`, returning the
    /// address of the first byte.
    ///
    /// Every allocation is at least [`MIN_ALLOCATION_ALIGN_BYTES`]-aligned and
    /// occupies at least one byte, so that distinct allocations always have
    /// distinct addresses. Returns [`None`], reserving nothing, if the
    /// allocation does not fit in what remains of the region.
    pub fn allocate(&mut self, region: Region, size: u64, align: u64) -> Option<u64> {
        let align = align.max(MIN_ALLOCATION_ALIGN_BYTES);
        let end = region.end(self.pointer_width);
        let next = match region {
            Region::Global => &mut self.next_global,
            Region::Stack => &mut self.next_stack,
            Region::Heap => &mut self.next_heap,
        };
        let base = align_to(*next, align)?;
        let after = base.checked_add(size.max(1)).filter(|&after| after <= end)?;
        *next = after;
        self.allocations.push(Allocation { base, size, region });

        Some(base)
    }

    /// Gets every allocation made so far.
    #[must_use]
    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    /// Gets the allocation that contains `address`, if any.
    #[must_use]
    pub fn allocation_containing(&self, address: u64) -> Option<&Allocation> {
        self.allocations
            .iter()
            .find(|a| address >= a.base && address < a.base.saturating_add(a.size.max(1)))
    }

    /// Builds the address `offset` bytes past `base`.
    #[must_use]
    pub fn offset(&self, b: &ExprBuilder, base: &Expr, offset: u64) -> Expr {
        b.bvadd(base.clone(), b.bv_u64(self.pointer_width, offset))
    }

    /// Reads `count` bytes starting at `address`, lowest address first.
    #[must_use]
    pub fn load(&self, b: &ExprBuilder, address: &Expr, count: u64) -> Vec<Expr> {
        (0..count)
            .map(|i| b.select(self.array.clone(), self.offset(b, address, i)))
            .collect()
    }

    /// Writes `bytes` starting at `address`, lowest address first.
    pub fn store(&mut self, b: &ExprBuilder, address: &Expr, bytes: Vec<Expr>) {
        for (i, byte) in (0u64..).zip(bytes) {
            let at = self.offset(b, address, i);
            self.array = b.store(self.array.clone(), at, byte);
        }
    }

    /// Writes the concrete `bytes` starting at the concrete `address`.
    pub fn store_concrete(&mut self, b: &ExprBuilder, address: u64, bytes: &[u8]) {
        let base = b.bv_u64(self.pointer_width, address);
        let bytes = bytes.iter().map(|byte| b.bv_u64(8, u64::from(*byte))).collect();
        self.store(b, &base, bytes);
    }

    /// Writes `count` copies of the byte `value` starting at `address`.
    pub fn fill(&mut self, b: &ExprBuilder, address: &Expr, value: &Expr, count: u64) {
        let bytes = (0..count).map(|_| value.clone()).collect();
        self.store(b, address, bytes);
    }

    /// Copies `count` bytes from `source` to `destination`.
    ///
    /// Every source byte is read before any is written, so overlapping ranges
    /// behave like `memmove`.
    pub fn copy(&mut self, b: &ExprBuilder, destination: &Expr, source: &Expr, count: u64) {
        let bytes = self.load(b, source, count);
        self.store(b, destination, bytes);
    }

    /// Forgets everything known about the contents of memory, replacing them
    /// with `array`.
    ///
    /// Allocations are kept, as havocking contents does not free objects.
    ///
    /// # Panics
    ///
    /// Panics if `array` has a different sort from the current memory.
    pub fn havoc(&mut self, array: Expr) {
        assert_eq!(
            array.sort(),
            self.array.sort(),
            "Memory can only be replaced by an array of the same sort"
        );
        self.array = array;
    }
}

/// The regions from which the allocator hands out addresses.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Region {
    /// Global variables and functions.
    Global,

    /// Stack allocations made by `alloca`.
    Stack,

    /// Heap allocations made by allocation functions.
    Heap,
}

impl Region {
    /// Gets the first address past the end of the region in an address space
    /// of `pointer_width` bits.
    #[must_use]
    pub fn end(self, pointer_width: u32) -> u64 {
        match self {
            Self::Global => STACK_REGION_BASE,
            Self::Stack => HEAP_REGION_BASE,
            Self::Heap => 1u64.checked_shl(pointer_width).unwrap_or(u64::MAX),
        }
    }
}

/// A block of memory handed out by the allocator.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Allocation {
    /// The address of the first byte.
    pub base: u64,

    /// The number of bytes requested.
    pub size: u64,

    /// The region the allocation belongs to.
    pub region: Region,
}

#[cfg(test)]
mod test {
    use crate::{
        constant::{HEAP_REGION_BASE, STACK_REGION_BASE},
        expr::{ExprBuilder, Sort},
        vm::state::memory::{Memory, Region},
    };

    fn memory(b: &ExprBuilder) -> Memory {
        Memory::new(b.var(
            "mem",
            Sort::Array {
                index:   64,
                element: 8,
            },
        ))
    }

    #[test]
    fn allocations_do_not_overlap() {
        let b = ExprBuilder::new(true);
        let mut memory = memory(&b);

        let first = memory.allocate(Region::Stack, 4, 4).expect("fits");
        let second = memory.allocate(Region::Stack, 0, 1).expect("fits");
        let third = memory.allocate(Region::Stack, 8, 8).expect("fits");
        let heap = memory.allocate(Region::Heap, 8, 8).expect("fits");

        assert_eq!(first, STACK_REGION_BASE);
        assert!(second >= first + 4);
        assert!(third > second);
        assert_eq!(heap, HEAP_REGION_BASE);
        assert_eq!(memory.allocation_containing(first + 2).map(|a| a.base), Some(first));
        assert_eq!(memory.allocations().len(), 4);
    }

    #[test]
    fn allocations_stay_inside_their_region() {
        let b = ExprBuilder::new(true);
        let mut memory = memory(&b);

        assert_eq!(memory.allocate(Region::Stack, u64::MAX, 1), None);
        assert_eq!(memory.allocate(Region::Stack, HEAP_REGION_BASE - STACK_REGION_BASE + 1, 1), None);
        assert!(memory.allocations().is_empty());

        let next = memory.allocate(Region::Stack, 8, 8);
        assert_eq!(next, Some(STACK_REGION_BASE));
        assert_eq!(Region::Heap.end(32), 1 << 32);
        assert_eq!(Region::Heap.end(64), u64::MAX);
    }

    #[test]
    fn reads_see_earlier_writes() {
        let b = ExprBuilder::new(true);
        let mut memory = memory(&b);
        let address = b.bv_u64(64, STACK_REGION_BASE);

        memory.store_concrete(&b, STACK_REGION_BASE, &[1, 2, 3]);
        let bytes = memory.load(&b, &address, 3);
        let values: Vec<_> = bytes.iter().filter_map(|e| e.as_bv()).map(|k| k.as_u64()).collect();

        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn copies_read_before_writing() {
        let b = ExprBuilder::new(true);
        let mut memory = memory(&b);
        let source = b.bv_u64(64, 0x100);
        let destination = b.bv_u64(64, 0x101);

        memory.store_concrete(&b, 0x100, &[7, 8]);
        memory.copy(&b, &destination, &source, 2);
        let bytes = memory.load(&b, &source, 3);
        let values: Vec<_> = bytes.iter().filter_map(|e| e.as_bv()).map(|k| k.as_u64()).collect();

        assert_eq!(values, vec![7, 7, 8]);
    }

    #[test]
    fn unknown_bytes_stay_symbolic() {
        let b = ExprBuilder::new(true);
        let memory = memory(&b);
        let bytes = memory.load(&b, &b.var("p", Sort::Bv(64)), 1);

        assert!(bytes[0].as_bv().is_none());
    }
}
