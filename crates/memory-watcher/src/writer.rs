use dma_core::Address;

/// Write-back channel for `set_frozen` (spec.md §4.F supplement). The core
/// DMA contract (`dma_core::DmaReader`/`MemoryReader`) is read-only, so a
/// freeze needs its own injected writer rather than growing that contract
/// a write method it was explicitly scoped not to have.
pub trait MemoryWriter {
    /// Writes `data` at `address`. Returns `true` on success; a failed
    /// write just means the freeze didn't take this tick, it is not an
    /// error condition.
    fn write(&self, address: Address, data: &[u8]) -> bool;
}

impl<F> MemoryWriter for F
where
    F: Fn(Address, &[u8]) -> bool,
{
    fn write(&self, address: Address, data: &[u8]) -> bool {
        self(address, data)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::MemoryWriter;
    use dma_core::Address;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// An in-memory fake writer backed by a shared byte store, so tests can
    /// assert what got written and feed it back through a matching reader.
    pub struct FakeWriter {
        pub store: Mutex<HashMap<Address, Vec<u8>>>,
    }

    impl FakeWriter {
        pub fn new() -> Self {
            Self { store: Mutex::new(HashMap::new()) }
        }
    }

    impl MemoryWriter for FakeWriter {
        fn write(&self, address: Address, data: &[u8]) -> bool {
            self.store.lock().unwrap().insert(address, data.to_vec());
            true
        }
    }
}
