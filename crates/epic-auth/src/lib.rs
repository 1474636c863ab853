//! Epic OAuth linking library
//!
//! PKCE flow generation, pending-session tracking, token exchange/refresh,
//! and token file storage for the Epic account link bridge. This crate is a
//! standalone library with no dependency on the service binary — it can be
//! tested and used independently.
//!
//! Link flow:
//! 1. `/login` calls `pkce::generate_verifier()` + `pkce::compute_challenge()`
//!    and `pkce::generate_state()` for the requesting external id
//! 2. The pending flow is parked in `session::SessionCache` and the user is
//!    redirected to `pkce::build_authorization_url()`
//! 3. The provider callback consumes the session (`SessionCache::take`, one
//!    shot) and calls `token::exchange_code()` with the stored verifier
//! 4. The token triple lands in `store::TokenStore::upsert()` under the
//!    external id
//! 5. `token::refresh_token()` renews it later; `TokenStore::update_tokens()`
//!    overwrites all three fields at once

pub mod app;
pub mod constants;
pub mod error;
pub mod pkce;
pub mod session;
pub mod store;
pub mod token;

pub use app::OAuthApp;
pub use constants::*;
pub use error::{Error, Result};
pub use pkce::{build_authorization_url, compute_challenge, generate_state, generate_verifier};
pub use session::{PendingAuth, SessionCache, unix_now};
pub use store::{TokenRecord, TokenStore};
pub use token::{TokenResponse, exchange_code, refresh_token};
