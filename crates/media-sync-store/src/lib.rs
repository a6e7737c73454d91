pub mod error;
pub mod snapshot;
pub mod store;
pub mod table;
pub mod tables;

pub use error::StoreError;
pub use snapshot::SnapshotStorage;
pub use store::LocalStore;
pub use table::{Keyed, Table};
pub use tables::Tables;
