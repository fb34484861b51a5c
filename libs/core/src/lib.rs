//! LeanIX client core: credentials, single-flight OAuth2 token management and
//! GraphQL execution against the instance named in the access token.

pub mod auth;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod graphql;
pub mod retry;
pub mod token;
pub mod transport;

#[cfg(test)]
mod testing;

pub use auth::TokenManager;
pub use client::{AuthFailure, Authenticate, LeanIxClient, retry_unauthenticated};
pub use config::ClientConfig;
pub use credentials::Credentials;
pub use error::{ErrorKind, LeanIxError};
pub use graphql::{GraphQlError, GraphQlResponse, Location};
pub use retry::RetryConfig;
pub use token::{AccessToken, JwtClaims, Session};
pub use transport::{GraphQlRequest, RawResponse, ReqwestTransport, Transport};
pub use url::Url;
