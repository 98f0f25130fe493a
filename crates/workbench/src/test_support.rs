//! Shared test double for the façade's own unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use dma_core::{Address, DmaReader};

pub(crate) struct FakeDma {
    image: Mutex<HashMap<u32, Vec<u8>>>,
    base: Address,
}

impl FakeDma {
    pub(crate) fn new(pid: u32, base: Address, image: Vec<u8>) -> Self {
        let mut map = HashMap::new();
        map.insert(pid, image);
        Self { image: Mutex::new(map), base }
    }
}

impl DmaReader for FakeDma {
    fn read(&self, pid: u32, address: Address, length: usize) -> Vec<u8> {
        let images = self.image.lock().unwrap();
        let Some(image) = images.get(&pid) else { return Vec::new() };
        if address < self.base {
            return Vec::new();
        }
        let offset = (address - self.base) as usize;
        if offset >= image.len() {
            return Vec::new();
        }
        let end = (offset + length).min(image.len());
        image[offset..end].to_vec()
    }
}
