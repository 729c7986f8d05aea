//! # rsclient - signed request client for the ResourceSpace API
//!
//! A blocking Rust client for the ResourceSpace digital asset management
//! API. Every call names an API function and passes positional arguments;
//! the client adds the user, signs the request with the shared private key
//! and turns the response into a payload or a classified error.
//!
//! ## Features
//!
//! - SHA-256 request signing compatible with the `userkey`, `sessionkey`
//!   and `native` auth modes
//! - GET, form POST and multipart upload transports
//! - Error taxonomy mapped from HTTP status codes
//! - File downloads written atomically to disk
//! - Pluggable [`Transport`] for testing without a server
//!
//! ## Basic Usage
//!
//! ```no_run
//! use rsclient::{Config, Params, RestContext};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::new("https://dam.example.com/api/", "alice", "private-key");
//!     let ctx = RestContext::new(config)?;
//!
//!     // get_resource_field_data(resource)
//!     let fields = ctx.get("get_resource_field_data", Params::new().arg("42"))?;
//!     println!("{:?}", fields.get("0/value"));
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Errors
//!
//! ```no_run
//! use rsclient::{Config, ErrorKind, Params, RestContext};
//!
//! let ctx = RestContext::new(Config::from_env()?)?;
//! match ctx.get("get_resource_data", Params::new().arg("999999")) {
//!     Ok(payload) => println!("{:?}", payload.value()),
//!     Err(err) if err.is_not_found() => println!("no such resource"),
//!     Err(err) if err.kind == ErrorKind::Authentication => println!("check credentials"),
//!     Err(err) => return Err(err),
//! }
//! # Ok::<(), rsclient::RestError>(())
//! ```
//!
//! ## Uploads
//!
//! ```no_run
//! use rsclient::{Config, FileUpload, Params, RestContext};
//!
//! let ctx = RestContext::new(Config::from_env()?)?;
//! let file = FileUpload::from_path("sunset.jpg")?;
//! // upload_multipart(resource_type, archive, no_exif, revert, autorotate, metadata)
//! ctx.upload_file(file, Params::positional(["1", "0", "0", "0", "1", "{}"]))?;
//! # Ok::<(), rsclient::RestError>(())
//! ```

pub mod client;
pub mod error;
pub mod mime_types;
pub mod params;
pub mod response;
pub mod rest;
pub mod signature;
pub mod transport;
pub mod upload;

// Re-export main types for convenience
pub use client::{AuthMode, Config};
pub use error::{ErrorKind, RestError, Result};
pub use mime_types::MimeLookup;
pub use params::Params;
pub use response::{interpret, Payload, Response};
pub use rest::RestContext;
pub use signature::Signer;
pub use transport::{FilePart, HttpRequest, HttpTransport, Method, RequestBody, Transport};
pub use upload::FileUpload;
