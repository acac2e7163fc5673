// Library root
// -----------
// This crate exposes a small library surface for the CLI. The binary
// (`main.rs`) uses these modules to implement the uploader.
//
// Module responsibilities:
// - `api`: Encapsulates HTTP interactions with Synapse (login, entity
//   lookup, folder creation, file upload) behind the `RemoteStore`
//   trait.
// - `mirror`: Walks a local directory tree and recreates it remotely,
//   delegating every remote mutation to `api`.
//
// Keeping this separation makes it easy to test the walk logic against
// an in-memory store instead of a live Synapse instance.
pub mod api;
pub mod mirror;
