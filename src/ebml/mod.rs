//! EBML serialization layer
//!
//! Low-level encoding of EBML elements: ids, vints, fixed-width integers,
//! floats, strings, binary blobs, master headers, and the pure size
//! arithmetic the two-pass muxer relies on.

pub mod codec;
pub mod ids;
