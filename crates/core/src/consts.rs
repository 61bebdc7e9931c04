//! Constant variables.
/// Width of the identifier space when none is configured.
pub const DEFAULT_IDENTIFIER_BITS: u8 = 128;
/// Identifiers are backed by `u128`.
pub const MAX_IDENTIFIER_BITS: u8 = 128;
/// Period of the stabilization task.
pub const DEFAULT_STABILIZE_INTERVAL_MS: u64 = 1000;
/// Scheme of outbound uris.
pub const DEFAULT_SCHEME: &str = "ws";
/// Prefix of the inbound route, followed by `/<hex id>/receive`.
pub const RECEIVE_PATH_PREFIX: &str = "/node";
/// Last segment of the inbound route.
pub const RECEIVE_PATH_SUFFIX: &str = "receive";
