use super::*;

const COUNTER_BITS: u32 = 27;
const COUNTER_MASK: u64 = (1 << COUNTER_BITS) - 1;

/// Number of pool instances that can share one backend without their
/// extranonce1 values colliding.
pub const MAX_INSTANCES: u64 = 1 << (ENONCE1_SIZE as u32 * 8 - COUNTER_BITS);

/// Hands out extranonce1 values from the sub-space reserved for this
/// instance. The top bits carry the instance id, the rest is a counter.
#[derive(Debug)]
pub struct ExtranonceAllocator {
    prefix: u64,
    counter: u64,
    total_size: usize,
}

impl ExtranonceAllocator {
    pub fn new(instance_id: u64, total_size: usize) -> Result<Self> {
        ensure!(
            instance_id < MAX_INSTANCES,
            "instance id {} exceeds maximum {}",
            instance_id,
            MAX_INSTANCES - 1
        );

        let enonce2_size = total_size.checked_sub(ENONCE1_SIZE).ok_or_else(|| {
            anyhow!(
                "extranonce size {} too small to carve out {} byte enonce1",
                total_size,
                ENONCE1_SIZE
            )
        })?;

        ensure!(
            enonce2_size >= MIN_ENONCE_SIZE,
            "enonce2_size {} below minimum {}",
            enonce2_size,
            MIN_ENONCE_SIZE
        );
        ensure!(
            enonce2_size <= MAX_ENONCE_SIZE,
            "enonce2_size {} exceeds maximum {}",
            enonce2_size,
            MAX_ENONCE_SIZE
        );

        Ok(Self {
            prefix: instance_id << COUNTER_BITS,
            counter: 0,
            total_size,
        })
    }

    pub fn get_new(&mut self) -> Extranonce {
        self.counter = (self.counter + 1) & COUNTER_MASK;
        Extranonce::from_counter(self.prefix | self.counter, ENONCE1_SIZE)
    }

    pub fn size(&self) -> usize {
        ENONCE1_SIZE
    }

    pub fn total_size(&self) -> usize {
        self.total_size
    }

    pub fn enonce2_size(&self) -> usize {
        self.total_size - ENONCE1_SIZE
    }
}
