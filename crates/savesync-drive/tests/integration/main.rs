//! Integration tests for savesync-drive
//!
//! Uses wiremock to simulate the Drive v3 API and the token relay, and
//! verifies listing, resumable uploads, downloads, deletes and the
//! refresh-once authorization policy end to end.

mod common;

mod test_auth;
mod test_list;
mod test_transfer;
