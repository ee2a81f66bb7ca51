//! Signed report download links and byte-range handling

mod range;
mod token;

pub use range::{parse_range, ByteRange, RangeRequest};
pub use token::{DownloadSigner, SignedToken, TokenError};
