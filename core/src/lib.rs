//! Client for the Pinboard bookmarking API (v1).
//!
//! # Overview
//! Calls are composed as a path of segments plus keyword arguments, encoded
//! into a GET URL, executed by a `Transport`, and the JSON reply is typed
//! according to which endpoint was called.
//!
//! ```no_run
//! use pinboard_core::{Pinboard, PostsQuery};
//!
//! let pinboard = Pinboard::new("user:0123456789ABCDEF");
//! let last_change = pinboard.posts_update()?;
//! let page = pinboard.posts_get(&PostsQuery::default())?;
//! for mut bookmark in page.posts {
//!     bookmark.tags.push("seen".to_string());
//!     bookmark.save(false)?;
//! }
//! // Any path works through the generic builder.
//! let reply = pinboard.posts().segment("recent").arg("count", 5u32).send()?;
//! # let _ = (last_change, reply);
//! # Ok::<(), pinboard_core::Error>(())
//! ```
//!
//! # Design
//! - `Pinboard` holds only the token, base URL and transport, all immutable.
//! - `Call::build` produces a `PreparedCall` (plain `HttpRequest`) and
//!   `PreparedCall::parse` consumes an `HttpResponse`, so the I/O boundary is
//!   explicit and the core is testable without a network.
//! - Field encoding and decoding follow the static tables in `policy`.
//! - Reply typing by call path lives in `mapper`.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod mapper;
pub mod policy;
pub mod types;

pub use client::{
    AllPostsQuery, AuthToken, Call, CallPath, NewPost, Pinboard, PostsQuery, PreparedCall,
    DEFAULT_BASE_URL,
};
pub use config::{Config, ConfigError};
pub use error::{Error, Result, TransportError};
pub use http::{HttpRequest, HttpResponse, Transport, UreqTransport};
pub use policy::{FieldKind, Param};
pub use types::{Bookmark, DateHistogram, Document, Field, NoteList, PostsPage, Reply, Tag};
