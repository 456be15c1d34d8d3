//! Host port allocation, guarded by a process-wide mutex (§5
//! "Preview port allocation is guarded by a process-wide mutex").

use std::collections::BTreeSet;
use std::sync::Mutex;

#[derive(Debug, thiserror::Error)]
#[error("no free port in range {0}-{1}")]
pub struct PortsExhausted(pub u16, pub u16);

pub struct PortAllocator {
    range: (u16, u16),
    in_use: Mutex<BTreeSet<u16>>,
}

impl PortAllocator {
    pub fn new(range: (u16, u16)) -> Self {
        Self {
            range,
            in_use: Mutex::new(BTreeSet::new()),
        }
    }

    /// Returns the lowest free port in the configured range (§4.9
    /// "Allocate an available host port from a configured range").
    pub fn allocate(&self) -> Result<u16, PortsExhausted> {
        let mut in_use = self.in_use.lock().unwrap_or_else(|e| e.into_inner());
        for port in self.range.0..=self.range.1 {
            if !in_use.contains(&port) {
                in_use.insert(port);
                return Ok(port);
            }
        }
        Err(PortsExhausted(self.range.0, self.range.1))
    }

    pub fn release(&self, port: u16) {
        self.in_use.lock().unwrap_or_else(|e| e.into_inner()).remove(&port);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn allocates_lowest_free_port_first() {
        let allocator = PortAllocator::new((8100, 8101));
        assert_eq!(allocator.allocate().unwrap(), 8100);
        assert_eq!(allocator.allocate().unwrap(), 8101);
    }

    #[test]
    fn exhausted_range_reports_error() {
        let allocator = PortAllocator::new((8100, 8100));
        allocator.allocate().unwrap();
        assert!(allocator.allocate().is_err());
    }

    #[test]
    fn released_port_is_reusable() {
        let allocator = PortAllocator::new((8100, 8100));
        let port = allocator.allocate().unwrap();
        allocator.release(port);
        assert_eq!(allocator.allocate().unwrap(), port);
    }
}
