//! Load stage: credentials, partition layout and storage sinks.

pub mod credentials;
pub mod partition;
pub mod sink;

pub use credentials::{
    AnonymousCredentials, CredentialProvider, Credentials, EnvTokenProvider, TokenFileProvider,
};
pub use partition::{encode_parquet, PartitionTarget, PartitionWriter, WriteResult};
pub use sink::{sink_for, GcsSink, LocalSink, StorageLocation, StorageSink};
