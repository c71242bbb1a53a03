//! Hex helpers for serialization and display
//!
//! Some header fields (checksums, flags, identifiers) read better in hex than as integers. The
//! `serialize_*` functions are meant for `#[serde(serialize_with = ...)]`.

macro_rules! generate_serialize_hex_fns {
    (($fn:ident, $format:literal, $trait:path)) => {
        pub fn $fn<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: serde::Serializer,
            T: $trait,
        {
            serializer.serialize_str(format!($format, value).as_str())
        }
    };

    ($($tt:tt,)*) => {
        $(
            generate_serialize_hex_fns!($tt);
        )+
    };
}

// Generate functions that can be used to Serialize a value to Hex
generate_serialize_hex_fns! {
    (serialize_lower_hex_u8, "0x{:02x}", core::fmt::LowerHex),
    (serialize_lower_hex_u16, "0x{:04x}", core::fmt::LowerHex),
    (serialize_lower_hex_u32, "0x{:08x}", core::fmt::LowerHex),
    (serialize_upper_hex_u16, "0x{:04X}", core::fmt::UpperHex),
}

/// Bytes shown in a `Raw` layer's attribute text.
pub const PREVIEW_BYTES: usize = 64;

/// Hex rendering of at most [`PREVIEW_BYTES`] bytes, with an ellipsis when cut short.
pub fn preview(bytes: &[u8]) -> String {
    if bytes.len() > PREVIEW_BYTES {
        format!("{}...", hex::encode(&bytes[..PREVIEW_BYTES]))
    } else {
        hex::encode(bytes)
    }
}
