// SPDX-FileCopyrightText: 2026 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use std::io;
use tokio_util::{
    bytes::{Buf, BytesMut},
    codec::Decoder,
};
use tracing::warn;

/// Splits the feed into raw newline terminated lines.
///
/// Unlike `LinesCodec` the content of a line is never an error: lines longer
/// than `max_length` are skipped up to the next newline and decoding goes on
/// with the line after it. Only I/O errors of the underlying stream end a
/// `FramedRead` using this codec.
#[derive(Debug, Clone)]
pub struct FeedLineCodec {
    max_length: usize,
    /// Skipping the rest of an oversized line.
    discarding: bool,
    /// Position in the buffer up to which no newline was found yet.
    next_index: usize,
}

impl FeedLineCodec {
    pub fn new(max_length: usize) -> Self {
        FeedLineCodec {
            max_length,
            discarding: false,
            next_index: 0,
        }
    }
}

impl Decoder for FeedLineCodec {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<BytesMut>, io::Error> {
        loop {
            let newline = buf[self.next_index..]
                .iter()
                .position(|b| *b == b'\n')
                .map(|offset| offset + self.next_index);
            match newline {
                Some(end) if self.discarding => {
                    buf.advance(end + 1);
                    self.discarding = false;
                    self.next_index = 0;
                }
                Some(end) if end > self.max_length => {
                    warn!("Skipping feed line of {end} bytes");
                    buf.advance(end + 1);
                    self.next_index = 0;
                }
                Some(end) => {
                    let mut line = buf.split_to(end + 1);
                    line.truncate(end);
                    self.next_index = 0;
                    return Ok(Some(line));
                }
                None if self.discarding || buf.len() > self.max_length => {
                    if !self.discarding {
                        warn!("Skipping feed line longer than {} bytes", self.max_length);
                    }
                    buf.clear();
                    self.discarding = true;
                    self.next_index = 0;
                    return Ok(None);
                }
                None => {
                    self.next_index = buf.len();
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<BytesMut>, io::Error> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        if self.discarding || buf.is_empty() {
            self.discarding = false;
            buf.clear();
            return Ok(None);
        }
        Ok(Some(buf.split_to(buf.len())))
    }
}
