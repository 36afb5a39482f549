//! Unit tests for the TIFF module

mod test_utils;
mod ifd_tests;
mod reader_tests;
