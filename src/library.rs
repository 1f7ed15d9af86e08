//! This module contains the oracle describing which library functions the
//! target provides, and therefore which calls may be given library semantics.

use std::collections::HashSet;

/// The library functions whose semantics are modelled.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum LibFunc {
    Malloc,
    Calloc,
    Free,
    Memcpy,
    Memmove,
    Memset,
    Abort,
    Exit,
    OperatorNew,
    OperatorDelete,
}

impl LibFunc {
    /// Every library function, in declaration order.
    pub const ALL: [LibFunc; 10] = [
        Self::Malloc,
        Self::Calloc,
        Self::Free,
        Self::Memcpy,
        Self::Memmove,
        Self::Memset,
        Self::Abort,
        Self::Exit,
        Self::OperatorNew,
        Self::OperatorDelete,
    ];

    /// Gets the symbol name of the function.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Malloc => "malloc",
            Self::Calloc => "calloc",
            Self::Free => "free",
            Self::Memcpy => "memcpy",
            Self::Memmove => "memmove",
            Self::Memset => "memset",
            Self::Abort => "abort",
            Self::Exit => "exit",
            Self::OperatorNew => "_Znwm",
            Self::OperatorDelete => "_ZdlPv",
        }
    }

    /// Checks whether the function returns a fresh heap allocation.
    #[must_use]
    pub fn is_allocation(self) -> bool {
        matches!(self, Self::Malloc | Self::Calloc | Self::OperatorNew)
    }

    /// Checks whether the function releases a heap allocation.
    #[must_use]
    pub fn is_deallocation(self) -> bool {
        matches!(self, Self::Free | Self::OperatorDelete)
    }
}

/// Describes which library functions are available on the target.
///
/// A function that is marked unavailable is treated like any other unknown
/// external function.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TargetLibraryInfo {
    available: HashSet<LibFunc>,
}

impl TargetLibraryInfo {
    /// Creates library info in which no library function is available.
    #[must_use]
    pub fn freestanding() -> Self {
        let available = HashSet::new();
        Self { available }
    }

    /// Marks `func` as unavailable.
    #[must_use]
    pub fn without(mut self, func: LibFunc) -> Self {
        self.available.remove(&func);
        self
    }

    /// Marks `func` as available.
    #[must_use]
    pub fn with(mut self, func: LibFunc) -> Self {
        self.available.insert(func);
        self
    }

    /// Checks whether `func` is available.
    #[must_use]
    pub fn has(&self, func: LibFunc) -> bool {
        self.available.contains(&func)
    }

    /// Gets the available library function with symbol name `name`.
    #[must_use]
    pub fn get_lib_func(&self, name: &str) -> Option<LibFunc> {
        LibFunc::ALL
            .into_iter()
            .find(|f| f.name() == name)
            .filter(|f| self.has(*f))
    }
}

/// By default every modelled library function is available.
impl Default for TargetLibraryInfo {
    fn default() -> Self {
        let available = LibFunc::ALL.into_iter().collect();
        Self { available }
    }
}
