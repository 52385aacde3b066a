// HTTP client implementation of the store interface.
// Mirrors the local store over the /api/v1 wire contract.

mod remote;

pub use remote::RemoteStore;
