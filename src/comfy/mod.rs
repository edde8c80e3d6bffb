/// Generation driver: submit, poll, fetch
pub mod client;
/// Blocking HTTP session with retry and backoff
pub mod transport;
