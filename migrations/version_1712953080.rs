//! Migration version_1712953080.rs
//! Generated: 2024-04-12 20:18:00 UTC

use tidemark::{ActionError, Migration};

pub struct Migration1712953080;

impl Migration for Migration1712953080 {
    fn version(&self) -> u64 {
        1712953080
    }

    fn up(&self) -> Result<(), ActionError> {
        Ok(())
    }

    fn down(&self) -> Result<(), ActionError> {
        Ok(())
    }
}
