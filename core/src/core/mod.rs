pub mod machine;
pub mod memory;
pub mod word;

pub use machine::Machine;
pub use memory::{AUTO_INDEX_FIRST, AUTO_INDEX_LAST, CoreMemory, MemoryError};
pub use word::{FIELD_SIZE, PAGE_MASK, SIGN_BIT, WORD_MASK};
