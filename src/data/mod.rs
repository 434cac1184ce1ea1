mod dataset;
mod loader;

pub use dataset::InMemoryDataset;
pub use loader::{Batches, StandardLoader};
