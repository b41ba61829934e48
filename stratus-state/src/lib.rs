//! Stratus State Management
//!
//! Persists reconciled state between runs, with locking for safe
//! concurrent access.
//!
//! - **StateFile**: every managed resource with its remote identifier
//! - **StateBackend**: storage trait; [`LocalBackend`] keeps a JSON file
//! - **LockInfo**: who holds the state and until when
//!
//! # Example
//!
//! ```ignore
//! use stratus_state::{create_backend, BackendConfig};
//!
//! let backend = create_backend(&BackendConfig::local("stratus.state.json")).await?;
//! let lock = backend.acquire_lock("apply").await?;
//! let mut state = backend.read_state().await?.unwrap_or_default();
//!
//! // ... record outcomes ...
//!
//! state.increment_serial();
//! backend.write_state(&state).await?;
//! backend.release_lock(&lock).await?;
//! ```

pub mod backend;
pub mod backends;
pub mod lock;
pub mod state;

pub use backend::{BackendConfig, BackendError, BackendResult, StateBackend};
pub use backends::{LocalBackend, create_backend};
pub use lock::LockInfo;
pub use state::{ResourceState, StateFile};
