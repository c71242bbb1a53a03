//! Opaque bytes

use serde::Serialize;

use crate::layer::{Attributes, Layer};
use crate::types::hex;

/// Bytes no decoder claimed. Every dissection ends in this layer when nothing else applies.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Raw {
    len: usize,
}

impl Raw {
    pub fn new(len: usize) -> Self {
        Self { len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Layer for Raw {
    fn name(&self) -> &'static str {
        "Raw"
    }

    fn short_name(&self) -> &'static str {
        "raw"
    }

    fn attributes(&self, bytes: &[u8], attrs: &mut Attributes) {
        attrs.add("Length", self.len);
        attrs.add("Data", hex::preview(bytes));
    }
}
