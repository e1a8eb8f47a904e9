//! Project migrations
//!
//! Every file generated with `tidemark-migrate blank` has to be declared here
//! and added to [`migrations`]; the CLI refuses to run while the migrations
//! directory and this list disagree.

use tidemark::Migration;

#[path = "../../migrations/version_1712953077.rs"]
mod version_1712953077;
#[path = "../../migrations/version_1712953080.rs"]
mod version_1712953080;

/// All migrations known to the CLI, in any order
pub fn migrations() -> Vec<Box<dyn Migration>> {
    vec![
        Box::new(version_1712953077::Migration1712953077),
        Box::new(version_1712953080::Migration1712953080),
    ]
}
