// Library exports for the server, the verifier binary, benchmarks and tests

// ===== Fixture compilation (startup) =====
pub mod fixture;

// ===== Request matching (per request) =====
pub mod matcher;

// ===== Serving and replay =====
pub mod replay;
pub mod server;

// ===== Ambient =====
pub mod config;
pub mod loader;
pub mod metrics;

pub use config::ReplayConfig;
pub use fixture::{CompileError, FixtureCompiler, LookupTable, SchemaSet};
pub use matcher::{IncomingRequest, MatchEngine, MatchResult};
pub use replay::{ReplayError, ReplayHarness, ReplayOptions, ReplaySummary};
pub use server::{MetricsServer, StubServer};
