//! Backend-as-a-service access layer.
//!
//! - **Supabase**: GoTrue auth + PostgREST tables over HTTP via reqwest
//! - **Memory**: in-process fake for tests and local runs

pub mod memory;
pub mod supabase;
pub mod traits;

pub use memory::MemoryBackend;
pub use supabase::{SupabaseBackend, SupabaseConfig};
pub use traits::{AuthBackend, AuthSession, Identity, ProfileStore, SignUpOutcome};
