//! Migration version_1712953077.rs
//! Generated: 2024-04-12 20:17:57 UTC

use tidemark::{ActionError, Migration};

pub struct Migration1712953077;

impl Migration for Migration1712953077 {
    fn version(&self) -> u64 {
        1712953077
    }

    fn up(&self) -> Result<(), ActionError> {
        Ok(())
    }

    fn down(&self) -> Result<(), ActionError> {
        Ok(())
    }
}
