// Library exports for the binary, integration tests and benchmarks

pub mod activity;
pub mod config;
pub mod matching;
pub mod mock;
pub mod replay;
pub mod server;

pub use activity::{ActivityEntry, ActivityLog, ActivitySink, FanoutSink, TracingSink};
pub use config::{Config, MatchConfig};
pub use matching::{MatchError, MatchRepository};
pub use mock::{FaultTag, MockFileNode, MockLibrary, MockNode, ServiceType};
pub use replay::{ReplayOutcome, Replayer};
pub use server::{DispatchError, DispatchSettings, MockServer, RequestDispatcher, ServerHandle};
