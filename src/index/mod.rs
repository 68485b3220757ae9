pub mod client;
pub mod types;

pub use client::{DEFAULT_INDEX_URL, FetchMetadata, PackageIndex};
pub use types::{Digests, Info, Package, PackageType, Release};
