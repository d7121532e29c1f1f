pub mod azure;
pub mod checkpoint;
pub mod filesystem;
pub mod memory;
pub mod traits;

pub use azure::AzureBlobStore;
pub use checkpoint::{BlobCheckpointStore, Checkpoint, CheckpointError, CheckpointStore};
pub use filesystem::FsBlobStore;
pub use memory::MemoryBlobStore;
pub use traits::{BlobError, BlobStore, Metadata};
