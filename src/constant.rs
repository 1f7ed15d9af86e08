//! This module contains constants that are needed throughout the codebase.

/// The width of a byte in bits.
pub const BYTE_SIZE_BITS: u32 = 8;

/// The width of a pointer in bits when the data layout does not say otherwise.
pub const DEFAULT_POINTER_SIZE_BITS: u32 = 64;

/// The ABI alignment of a pointer in bytes when the data layout does not say
/// otherwise.
pub const DEFAULT_POINTER_ALIGN_BYTES: u64 = 8;

/// The widest bit-vector constant that can be represented concretely.
///
/// Terms of wider sorts can still be built, but their constant parts must be
/// assembled from narrower pieces.
pub const MAX_CONSTANT_WIDTH_BITS: u32 = 256;

/// The name of the array-valued register that holds the memory of a context.
pub const MEMORY_REGISTER_NAME: &str = "mem";

/// The prefix of the per-block error flag registers.
pub const ERROR_FLAG_PREFIX: &str = "error.flag";

/// The prefix of fresh, unconstrained symbols created during translation.
pub const FRESH_SYMBOL_PREFIX: &str = "nd";

/// The separator used when building qualified register names.
pub const NAME_SEPARATOR: char = '!';

/// The lowest address handed out to global variables and functions.
///
/// Address zero is never allocated so that it can stand for the null pointer.
pub const GLOBAL_REGION_BASE: u64 = 0x0000_1000;

/// The lowest address handed out to stack allocations.
pub const STACK_REGION_BASE: u64 = 0x1000_0000;

/// The lowest address handed out to heap allocations.
pub const HEAP_REGION_BASE: u64 = 0x4000_0000;

/// The minimum alignment of every allocation made by the memory model.
pub const MIN_ALLOCATION_ALIGN_BYTES: u64 = 16;

/// The default number of bytes reserved for an allocation whose size is not
/// known at translation time.
pub const DEFAULT_MAX_SYMBOLIC_ALLOC_BYTES: u64 = 4096;

/// The default maximum number of bytes that a single `memcpy`, `memmove` or
/// `memset` will be expanded into individual byte stores.
pub const DEFAULT_MAX_CONCRETE_COPY_BYTES: u64 = 1024;

/// Whether term simplification beyond constant folding is enabled by default.
pub const DEFAULT_SIMPLIFY_ENABLED: bool = true;

/// Whether memory is havocked by calls the semantics does not model.
pub const DEFAULT_HAVOC_MEMORY_ON_UNKNOWN_CALL: bool = true;

/// Calls to functions whose names begin with these prefixes are skipped.
pub const SKIPPED_CALL_PREFIXES: &[&str] = &[
    "llvm.dbg.",
    "llvm.lifetime.",
    "llvm.invariant.",
    "llvm.stacksave",
    "llvm.stackrestore",
    "llvm.prefetch",
    "llvm.donothing",
    "llvm.sideeffect",
    "shadow.mem.",
];

/// Calls to functions whose names begin with these prefixes return a fresh,
/// unconstrained value.
pub const NONDET_CALL_PREFIXES: &[&str] = &["nondet", "__VERIFIER_nondet_", "verifier.nondet"];

/// Calls to these functions assume that their argument holds.
pub const ASSUME_FUNCTIONS: &[&str] = &["verifier.assume", "llvm.assume", "__VERIFIER_assume"];

/// Calls to these functions assume that their argument does not hold.
pub const ASSUME_NOT_FUNCTIONS: &[&str] = &["verifier.assume.not"];

/// Calls to these functions set the error flag of the block when their
/// argument does not hold.
pub const ASSERT_FUNCTIONS: &[&str] = &["verifier.assert", "__VERIFIER_assert"];

/// Calls to these functions set the error flag of the block.
pub const ERROR_FUNCTIONS: &[&str] = &["verifier.error", "__VERIFIER_error"];
