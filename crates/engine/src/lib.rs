//! # Anvil Console Engine
//!
//! Turns raw form values into JSON-RPC invocations against an Anvil node and
//! reports a single, classified outcome for each one.
//!
//! ## Pipeline
//!
//! 1. **`coerce`**: checks and converts one raw value against its declared parameter type
//! 2. **`request`**: builds the positional argument list in declared order
//! 3. **`dispatcher`**: owns the invocation state machine and the transport call
//! 4. **`classify`**: maps every failure onto exactly one error kind
//! 5. **`materialize`**: wraps download-flagged results into JSON artifacts
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use anvil_console_engine::{HttpTransport, InvocationDispatcher};
//! use anvil_console_registry::MethodRegistry;
//! use anvil_console_util::ConsoleConfig;
//! use indexmap::IndexMap;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let registry = Arc::new(MethodRegistry::from_embedded_catalog()?);
//! let transport = Arc::new(HttpTransport::from_config(&ConsoleConfig::default())?);
//! let dispatcher = InvocationDispatcher::new(registry, transport);
//!
//! let id = dispatcher.submit("eth_blockNumber", IndexMap::new())?;
//! let outcome = dispatcher.wait(id).await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod coerce;
pub mod dispatcher;
pub mod materialize;
pub mod request;
pub mod transport;

pub use classify::{Failure, classify};
pub use coerce::coerce;
pub use dispatcher::{DispatchError, InvocationDispatcher, InvocationSnapshot};
pub use materialize::{artifact_filename, materialize};
pub use request::build_request;
pub use transport::{HttpTransport, Transport};
