//! Slash-command interaction handling and command registration.

mod client;
mod credentials;
mod dispatcher;
mod error;
mod registry;
mod scope;
mod syncer;
mod verify;

pub use client::{
    ApiClient, ApiRequest, ApiResponse, CommandApi, HttpTransport, ReqwestTransport, SleepFn,
    DEFAULT_API_BASE_URL, MAX_ATTEMPTS, RETRY_MARGIN,
};
pub use credentials::Credentials;
pub use dispatcher::{InteractionDispatcher, MAX_RESPONSE_TIME};
pub use error::{ApiError, CredentialsError, DispatchError, RegistryError, SyncError, SyncPhase};
pub use registry::{CommandHandler, CommandRegistry, HandlerResult, SlashCommand};
pub use scope::Scope;
pub use syncer::Syncer;
pub use verify::{verify, SIGNATURE_HEADER, TIMESTAMP_HEADER};

/// Result type for command-management API calls.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
