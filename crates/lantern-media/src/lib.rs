//! Media handling: content-addressed reference tokens, payload scanning,
//! background uploads, and token resolution back to data URIs.
//!
//! The flow on the write path: [`MediaScanner`] rewrites a payload,
//! replacing each base64 data URI with a [`MediaReference`] token and
//! handing the raw bytes to a [`MediaUploader`], which uploads them in the
//! background. On the read path [`MediaResolver`] turns tokens back into
//! data URIs.

pub mod reference;
pub mod scan;
pub mod transport;
pub mod uploader;

pub use reference::{sha256_standard_base64, MediaReference, MediaSource, CONTENT_ID_LEN};
pub use scan::{MediaResolver, MediaScanner, ScannedMedia, DEFAULT_MAX_DEPTH};
pub use transport::{
    HttpMediaTransport, MediaPayload, MediaTransport, UploadStatusPatch, UploadUrlRequest,
    UploadUrlResponse,
};
pub use uploader::{MediaField, MediaUploader, UploadContext};
