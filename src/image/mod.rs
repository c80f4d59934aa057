//! Image-data references.

mod types;

pub(crate) use types::decode_base64_lenient;
pub use types::{
    download_filename, download_filename_at, DataUrlError, ImageData, ImageFormat, DOWNLOAD_PREFIX,
};
