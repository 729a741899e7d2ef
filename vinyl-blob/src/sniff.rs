//! Content type detection from leading bytes.
//!
//! The declared type of an upload is never trusted; the stored type is
//! whatever the signature table below says.

struct Signature {
    offset: usize,
    magic: &'static [u8],
    mime: &'static str,
}

const SIGNATURES: &[Signature] = &[
    Signature { offset: 0, magic: b"ID3", mime: "audio/mpeg" },
    Signature { offset: 0, magic: b"fLaC", mime: "audio/flac" },
    Signature { offset: 0, magic: b"OggS", mime: "audio/ogg" },
    Signature { offset: 0, magic: b"MThd", mime: "audio/midi" },
    Signature { offset: 0, magic: b"#!AMR", mime: "audio/amr" },
    Signature { offset: 0, magic: b"%PDF-", mime: "application/pdf" },
    Signature { offset: 0, magic: b"\x89PNG\r\n\x1a\n", mime: "image/png" },
    Signature { offset: 0, magic: b"\xFF\xD8\xFF", mime: "image/jpeg" },
    Signature { offset: 0, magic: b"GIF8", mime: "image/gif" },
    Signature { offset: 0, magic: b"PK\x03\x04", mime: "application/zip" },
];

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Detects the media type of `data`.
pub fn detect_content_type(data: &[u8]) -> &'static str {
    if let Some(sig) = SIGNATURES
        .iter()
        .find(|sig| data.get(sig.offset..sig.offset + sig.magic.len()) == Some(sig.magic))
    {
        return sig.mime;
    }

    if let Some(mime) = detect_container(data) {
        return mime;
    }

    if let Some(mime) = detect_frame_sync(data) {
        return mime;
    }

    if looks_like_text(data) {
        return "text/plain";
    }

    OCTET_STREAM
}

pub fn is_audio(mime: &str) -> bool {
    mime.starts_with("audio/")
}

// RIFF/WAVE, FORM/AIFF and ISO base media (ftyp) containers.
fn detect_container(data: &[u8]) -> Option<&'static str> {
    let head = data.get(0..12)?;
    match (&head[0..4], &head[4..8], &head[8..12]) {
        (b"RIFF", _, b"WAVE") => Some("audio/wav"),
        (b"FORM", _, b"AIFF") | (b"FORM", _, b"AIFC") => Some("audio/aiff"),
        (_, b"ftyp", brand) => Some(match brand {
            b"M4A " | b"M4B " | b"M4P " | b"F4A " => "audio/mp4",
            b"3gp4" | b"3gp5" | b"isom" | b"mp41" | b"mp42" | b"qt  " => "video/mp4",
            _ => OCTET_STREAM,
        }),
        _ => None,
    }
}

// Bare MPEG audio or ADTS AAC frames without an ID3 tag.
fn detect_frame_sync(data: &[u8]) -> Option<&'static str> {
    let (b0, b1) = (*data.first()?, *data.get(1)?);
    if b0 != 0xFF {
        return None;
    }
    if b1 & 0xF6 == 0xF0 {
        return Some("audio/aac");
    }
    let layer = (b1 >> 1) & 0b11;
    if b1 & 0xE0 == 0xE0 && layer != 0 {
        return Some("audio/mpeg");
    }
    None
}

fn looks_like_text(data: &[u8]) -> bool {
    let sample = &data[..data.len().min(512)];
    let text = match std::str::from_utf8(sample) {
        Ok(t) => t,
        // A multi-byte char may be cut at the sample boundary.
        Err(e) if e.error_len().is_none() => match std::str::from_utf8(&sample[..e.valid_up_to()]) {
            Ok(t) => t,
            Err(_) => return false,
        },
        Err(_) => return false,
    };
    !text.is_empty()
        && text
            .chars()
            .all(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t' | '\x0C'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_audio_signatures() {
        let cases: &[(&[u8], &str)] = &[
            (b"ID3\x04\x00\x00\x00\x00\x00\x00", "audio/mpeg"),
            (&[0xFF, 0xFB, 0x90, 0x64], "audio/mpeg"),
            (&[0xFF, 0xF1, 0x50, 0x80], "audio/aac"),
            (b"fLaC\x00\x00\x00\x22", "audio/flac"),
            (b"OggS\x00\x02", "audio/ogg"),
            (b"RIFF\x24\x08\x00\x00WAVEfmt ", "audio/wav"),
            (b"FORM\x00\x00\x00\x00AIFF", "audio/aiff"),
            (b"\x00\x00\x00\x20ftypM4A \x00\x00", "audio/mp4"),
        ];
        for (data, expected) in cases {
            let got = detect_content_type(data);
            assert_eq!(got, *expected);
            assert!(is_audio(got));
        }
    }

    #[test]
    fn text_is_not_audio_whatever_it_claims() {
        let got = detect_content_type(b"this is definitely an mp3, trust me\n");
        assert_eq!(got, "text/plain");
        assert!(!is_audio(got));
    }

    #[test]
    fn other_formats() {
        assert_eq!(detect_content_type(b"%PDF-1.7"), "application/pdf");
        assert_eq!(detect_content_type(b"\x00\x00\x00\x18ftypmp42"), "video/mp4");
        assert_eq!(detect_content_type(&[0x00, 0x01, 0x02, 0x03]), OCTET_STREAM);
        assert_eq!(detect_content_type(&[]), OCTET_STREAM);
    }

    #[test]
    fn utf8_cut_at_sample_edge_is_still_text() {
        let mut data = "a".repeat(511).into_bytes();
        data.extend_from_slice("é".as_bytes());
        assert_eq!(detect_content_type(&data), "text/plain");
    }
}
