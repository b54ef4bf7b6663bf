mod client;
mod resources;
mod session;

pub use client::{ApiClient, ApiResponse, FlightGuard, DEFAULT_TIMEOUT_SECS};
pub use resources::{ActivityEntry, BulkImportResult, BulkRowError, LoginResponse};
pub use session::{FileTokenStore, MemoryTokenStore, Session, SessionUser, TokenStore};
