use std::ops::RangeInclusive;

use encoding_rs::{DecoderResult, Encoding};

use crate::error::{DecodeError, DecodeErrorReason};

/// A named text encoding that can turn bytes into text and back.
pub trait Codec {
    fn name(&self) -> &'static str;

    /// Strictly decode `bytes`. Malformed input is an error, never replaced.
    fn decode(&self, bytes: &[u8]) -> Result<String, DecodeError>;

    fn encode(&self, text: &str) -> Vec<u8>;
}

/// GBK as code page 936 defines it.
pub static GBK: Cp936Codec = Cp936Codec;

pub static UTF_8: EncodingCodec = EncodingCodec {
    encoding: &encoding_rs::UTF_8_INIT,
};

/// [`Codec`] backed by an `encoding_rs` encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingCodec {
    encoding: &'static Encoding,
}

impl Codec for EncodingCodec {
    fn name(&self) -> &'static str {
        self.encoding.name()
    }

    fn decode(&self, bytes: &[u8]) -> Result<String, DecodeError> {
        // BOM bytes are content here, not an encoding hint.
        let mut decoder = self.encoding.new_decoder_without_bom_handling();
        let mut text = String::with_capacity(bytes.len());
        let mut consumed = 0;
        // The first pass runs with `last == false` so that a sequence cut off
        // at end of input is left pending instead of reported as illegal.
        let mut last = false;

        loop {
            let (result, read) =
                decoder.decode_to_string_without_replacement(&bytes[consumed..], &mut text, last);
            consumed += read;

            match result {
                DecoderResult::InputEmpty if last => return Ok(text),
                DecoderResult::InputEmpty => last = true,
                DecoderResult::OutputFull => {
                    let needed = decoder
                        .max_utf8_buffer_length_without_replacement(bytes.len() - consumed)
                        .unwrap_or(bytes.len() - consumed);
                    text.reserve(needed.max(4));
                }
                DecoderResult::Malformed(bad, after) => {
                    let end = consumed.saturating_sub(usize::from(after));
                    let start = end.saturating_sub(usize::from(bad));
                    let reason = if last {
                        DecodeErrorReason::IncompleteSequence
                    } else {
                        DecodeErrorReason::IllegalSequence
                    };
                    return Err(DecodeError {
                        encoding: self.name(),
                        offset: start,
                        bytes: bytes[start..end].to_vec(),
                        reason,
                    });
                }
            }
        }
    }

    fn encode(&self, text: &str) -> Vec<u8> {
        let (bytes, _encoding_used, _had_unmappables) = self.encoding.encode(text);
        bytes.into_owned()
    }
}

/// Two-byte codes that GB18030 assigns but code page 936 leaves undefined.
const GB18030_ONLY: [RangeInclusive<u16>; 7] = [
    0xa2e3..=0xa2e3,
    0xa6d9..=0xa6df,
    0xa6ec..=0xa6ed,
    0xa6f3..=0xa6f3,
    0xa8bc..=0xa8bc,
    0xa989..=0xa995,
    0xfe50..=0xfea0,
];

/// Strict code page 936.
///
/// `encoding_rs::GBK` is the WHATWG decoder, which is really GB18030: it
/// takes four-byte sequences, a single 0x80 and a handful of newer two-byte
/// codes. All of those are rejected here. Each byte at or above 0x80 starts a
/// two-byte sequence, and a failure is reported at that lead byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cp936Codec;

impl Cp936Codec {
    fn error(&self, offset: usize, lead: u8, reason: DecodeErrorReason) -> DecodeError {
        DecodeError {
            encoding: self.name(),
            offset,
            bytes: vec![lead],
            reason,
        }
    }
}

impl Codec for Cp936Codec {
    fn name(&self) -> &'static str {
        encoding_rs::GBK.name()
    }

    fn decode(&self, bytes: &[u8]) -> Result<String, DecodeError> {
        let mut text = String::with_capacity(bytes.len() + bytes.len() / 2);
        let mut pos = 0;

        while pos < bytes.len() {
            let lead = bytes[pos];
            if lead.is_ascii() {
                text.push(char::from(lead));
                pos += 1;
                continue;
            }

            let Some(&trail) = bytes.get(pos + 1) else {
                return Err(self.error(pos, lead, DecodeErrorReason::IncompleteSequence));
            };
            match cp936_pair(lead, trail) {
                Some(c) => {
                    text.push(c);
                    pos += 2;
                }
                None => return Err(self.error(pos, lead, DecodeErrorReason::IllegalSequence)),
            }
        }

        Ok(text)
    }

    fn encode(&self, text: &str) -> Vec<u8> {
        let (bytes, _encoding_used, _had_unmappables) = encoding_rs::GBK.encode(text);
        bytes.into_owned()
    }
}

fn cp936_pair(lead: u8, trail: u8) -> Option<char> {
    // Trail bytes 0x30..=0x39 belong to the GB18030 four-byte form.
    if !(0x81..=0xfe).contains(&lead) || !(0x40..=0xfe).contains(&trail) || trail == 0x7f {
        return None;
    }
    let code = u16::from_be_bytes([lead, trail]);
    if GB18030_ONLY.iter().any(|range| range.contains(&code)) {
        return None;
    }

    let c = gb18030_pair(lead, trail)?;
    // The user-defined areas only map to private use code points.
    if ('\u{e000}'..='\u{f8ff}').contains(&c) {
        return None;
    }
    Some(c)
}

fn gb18030_pair(lead: u8, trail: u8) -> Option<char> {
    let mut decoder = encoding_rs::GBK.new_decoder_without_bom_handling();
    let mut buf = [0u8; 8];
    let (result, read, written) =
        decoder.decode_to_utf8_without_replacement(&[lead, trail], &mut buf, true);
    if result != DecoderResult::InputEmpty || read != 2 {
        return None;
    }

    let mut chars = std::str::from_utf8(&buf[..written]).ok()?.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gbk_decode() {
        // "你好" in GBK: 0xC4, 0xE3, 0xBA, 0xC3
        assert_eq!(GBK.decode(b"\xc4\xe3\xba\xc3").unwrap(), "你好");
    }

    #[test]
    fn test_gbk_extension_decode() {
        // 0x8140 is the first GBK/3 code, 0xA1AA the em dash.
        assert_eq!(GBK.decode(b"\x81\x40\xa1\xaa").unwrap(), "丂\u{2014}");
    }

    #[test]
    fn test_ascii_passthrough() {
        assert_eq!(GBK.decode(b"hello.txt").unwrap(), "hello.txt");
        assert_eq!(UTF_8.encode("hello.txt"), b"hello.txt");
    }

    #[test]
    fn test_empty() {
        assert_eq!(GBK.decode(b"").unwrap(), "");
        assert!(UTF_8.encode("").is_empty());
    }

    #[test]
    fn test_utf8_encode() {
        assert_eq!(UTF_8.encode("你好"), b"\xe4\xbd\xa0\xe5\xa5\xbd");
    }

    #[test]
    fn test_gbk_encode() {
        assert_eq!(GBK.encode("你好"), b"\xc4\xe3\xba\xc3");
    }

    #[test]
    fn test_illegal_single_byte() {
        // 0xFF is never a valid GBK lead byte.
        let err = GBK.decode(b"abc\xffdef").unwrap_err();
        assert_eq!(err.offset, 3);
        assert_eq!(err.bytes, vec![0xff]);
        assert_eq!(err.reason, DecodeErrorReason::IllegalSequence);
    }

    #[test]
    fn test_illegal_after_valid_text() {
        let err = GBK.decode(b"\xc4\xe3\xba\xc3\xff!").unwrap_err();
        assert_eq!(err.offset, 4);
        assert_eq!(err.reason, DecodeErrorReason::IllegalSequence);
    }

    #[test]
    fn test_truncated_sequence() {
        // Lead byte of "你" without its trail byte.
        let err = GBK.decode(b"ab\xc4").unwrap_err();
        assert_eq!(err.offset, 2);
        assert_eq!(err.bytes, vec![0xc4]);
        assert_eq!(err.reason, DecodeErrorReason::IncompleteSequence);
    }

    #[test]
    fn test_four_byte_sequence_rejected() {
        let err = GBK.decode(b"\x81\x30\x81\x30").unwrap_err();
        assert_eq!(err.offset, 0);
        assert_eq!(err.bytes, vec![0x81]);
        assert_eq!(err.reason, DecodeErrorReason::IllegalSequence);

        let err = GBK.decode(b"ok\xc4\xe3\x84\x31\xa4\x39").unwrap_err();
        assert_eq!(err.offset, 4);
        assert_eq!(err.reason, DecodeErrorReason::IllegalSequence);
    }

    #[test]
    fn test_gb18030_only_codes_rejected() {
        for code in [b"\xa2\xe3", b"\xfe\x50", b"\xa6\xd9", b"\xa8\xbc", b"\xa9\x8a"] {
            let err = GBK.decode(code).unwrap_err();
            assert_eq!(err.offset, 0, "{code:02x?}");
            assert_eq!(err.reason, DecodeErrorReason::IllegalSequence, "{code:02x?}");
        }
    }

    #[test]
    fn test_user_defined_area_rejected() {
        // 0xAAA1 and 0xF8A1 open two user-defined areas.
        for code in [b"\xaa\xa1", b"\xf8\xa1"] {
            let err = GBK.decode(code).unwrap_err();
            assert_eq!(err.reason, DecodeErrorReason::IllegalSequence, "{code:02x?}");
        }
    }

    #[test]
    fn test_single_0x80_rejected() {
        let err = GBK.decode(b"\x80").unwrap_err();
        assert_eq!(err.offset, 0);
        assert_eq!(err.bytes, vec![0x80]);
        assert_eq!(err.reason, DecodeErrorReason::IncompleteSequence);

        let err = GBK.decode(b"\x80abc").unwrap_err();
        assert_eq!(err.offset, 0);
        assert_eq!(err.reason, DecodeErrorReason::IllegalSequence);
    }

    #[test]
    fn test_strict_utf8_decode() {
        assert_eq!(UTF_8.decode("运营".as_bytes()).unwrap(), "运营");
        let err = UTF_8.decode(b"ok\xc3\x28").unwrap_err();
        assert_eq!(err.offset, 2);
        assert_eq!(err.encoding, "UTF-8");
    }

    #[test]
    fn test_utf8_truncated_sequence() {
        let err = UTF_8.decode(b"ok\xe4\xbd").unwrap_err();
        assert_eq!(err.reason, DecodeErrorReason::IncompleteSequence);
    }

    #[test]
    fn test_bom_is_content() {
        assert_eq!(UTF_8.decode(b"\xef\xbb\xbfa").unwrap(), "\u{feff}a");
    }
}
