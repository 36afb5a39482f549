//! Compression handling for TIFF strips
//!
//! Each supported compression method is a `CompressionHandler` strategy;
//! the factory maps TIFF compression codes and user-facing names to them.

mod handler;
mod uncompressed;
mod deflate;
mod factory;
mod zstd;

pub use handler::CompressionHandler;
pub use uncompressed::UncompressedHandler;
pub use deflate::AdobeDeflateHandler;
pub use factory::CompressionFactory;
pub use zstd::ZstdHandler;
