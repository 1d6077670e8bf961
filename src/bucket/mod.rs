mod cache;
mod probe;
mod provisioner;
mod store;

pub use cache::{Clock, ManualClock, StatusCache, SystemClock};
pub use probe::{ProbeOutcome, ProbeStrategy, StoreProbe};
pub use provisioner::{BucketProvisioner, validate_bucket_name};
pub use store::{
    BucketManifest, CredentialTier, FsObjectStore, ObjectStore, StorageError, StorageErrorKind,
};
