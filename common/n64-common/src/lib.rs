pub mod digest;
pub mod frontend;

pub use digest::{ContentDigest, Md5Digest};
