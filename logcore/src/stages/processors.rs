// /////////////////////////////////////////////////////////////////////////////
// logcore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Built-in processors (spec §4.6.4): sequential byte-level transforms over
//! the serialized view, only invoked when `serialize_in_flush` is enabled.
//! Most pipelines configure zero processors; `GzipProcessor` is provided as
//! a reference implementation for sinks that prefer compressed payloads.

use flate2::write::GzEncoder;
use flate2::Compression;
use logcore_domain::{Processor, SerializedView};
use std::io::Write;

pub struct GzipProcessor {
    level: Compression,
}

impl GzipProcessor {
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level),
        }
    }
}

impl Default for GzipProcessor {
    fn default() -> Self {
        Self::new(6)
    }
}

impl Processor for GzipProcessor {
    fn name(&self) -> &str {
        "gzip"
    }

    fn process(&self, view: SerializedView) -> Result<SerializedView, String> {
        let mut encoder = GzEncoder::new(Vec::new(), self.level);
        encoder.write_all(view.as_bytes()).map_err(|e| e.to_string())?;
        let compressed = encoder.finish().map_err(|e| e.to_string())?;
        Ok(SerializedView::from(compressed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gzip_round_trips_via_decoder() {
        use flate2::read::GzDecoder;
        use std::io::Read;

        let processor = GzipProcessor::default();
        let view = SerializedView::new(b"{\"message\":\"hello\"}".to_vec());
        let compressed = processor.process(view).unwrap();

        let mut decoder = GzDecoder::new(compressed.as_bytes());
        let mut out = String::new();
        decoder.read_to_string(&mut out).unwrap();
        assert_eq!(out, "{\"message\":\"hello\"}");
    }
}
