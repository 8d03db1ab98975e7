pub mod memory;
pub mod query;
pub mod tag;

pub use memory::{Memory, MemoryPatch, MemoryRow, NewMemory, DATE_FORMAT};
pub use query::{ListParams, ListQuery, MemoryPage, SearchCriteria, SearchParams, SortOrder};
pub use tag::Tag;
