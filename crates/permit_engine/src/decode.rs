use chardetng::EncodingDetector;
use encoding_rs::Encoding;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedListing {
    pub html: String,
    pub encoding: &'static str,
    /// Malformed sequences were replaced with U+FFFD.
    pub had_errors: bool,
}

/// Decode listing bytes into UTF-8 using: BOM -> Content-Type charset -> chardetng guess.
///
/// Decoding is lossy and never fails; link extraction still works on a page
/// with a few malformed bytes.
pub fn decode_listing(bytes: &[u8], content_type: Option<&str>) -> DecodedListing {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(enc) = content_type
        .and_then(charset_label)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return decode_with(bytes, enc);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_with(bytes, detector.guess(None, true))
}

fn charset_label(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(&['"', '\''][..]).to_string())
    })
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> DecodedListing {
    // `decode` sniffs a BOM again and may switch encodings; report the one used.
    let (text, used, had_errors) = enc.decode(bytes);
    DecodedListing {
        html: text.into_owned(),
        encoding: used.name(),
        had_errors,
    }
}
