//! Incremental mirroring of remote audit log feeds into blob storage.
//!
//! Each configured stream is synchronized independently: its checkpoint is
//! loaded from the destination container, the feed is paged from that point,
//! every page is archived as one object, and the checkpoint is advanced only
//! after the terminal page.

pub mod archive;
pub mod auth;
pub mod cli;
pub mod config;
pub mod cursor;
pub mod feed;
pub mod storage;
pub mod stream;
pub mod sync;
