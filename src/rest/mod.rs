//! REST subsystem.
//!
//! # Data Flow
//! ```text
//! caller
//!     → dispatcher.rs (admission, retry on 429)
//!     → transport.rs (reqwest, auth + client headers)
//!     → response.rs (classify: success body / ApiError / HttpError / throttle)
//!     → caller
//! ```
//!
//! # Design Decisions
//! - Errors always go back to the call site, never to a global handler
//! - Only server-signalled throttling is retried, for as long as it lasts
//! - The transport is a trait so the dispatcher can be driven without sockets

pub mod dispatcher;
pub mod error;
pub mod request;
pub mod response;
pub mod retry;
pub mod routes;
pub mod transport;

pub use dispatcher::RequestDispatcher;
pub use error::{ApiError, HttpError, RestError, RestResult};
pub use request::ApiRequest;
pub use response::{RawResponse, ResponseBody};
pub use transport::{HttpTransport, ReqwestTransport};
