//! Character sets for short message text.
//!
//! `msg_data` travels in the character set named by the message's `charset`
//! label. Every other text field is UTF-8. Decoding never fails: bytes that
//! do not fit the character set become U+FFFD. Encoding replaces characters
//! the set cannot represent with `?`.

/// Character set a short message body can be carried in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextCharset {
    Utf8,
    Utf16Be,
    Utf16Le,
    /// UTF-16 led by a byte order mark. Big-endian when the mark is missing.
    Utf16,
    Latin1,
    Ascii,
}

const BOM_BE: [u8; 2] = [0xfe, 0xff];
const BOM_LE: [u8; 2] = [0xff, 0xfe];

impl TextCharset {
    /// Look up a charset by label, ignoring case and common aliases.
    ///
    /// # Examples
    ///
    /// ```
    /// use bearerbox::codec::charset::TextCharset;
    ///
    /// assert_eq!(TextCharset::from_label("utf-16be"), Some(TextCharset::Utf16Be));
    /// assert_eq!(TextCharset::from_label("latin1"), Some(TextCharset::Latin1));
    /// assert_eq!(TextCharset::from_label("KOI8-R"), None);
    /// ```
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let normalised = label.trim().to_ascii_uppercase().replace('_', "-");
        let charset = match normalised.as_str() {
            "UTF-8" | "UTF8" => Self::Utf8,
            "UTF-16BE" | "UTF16BE" => Self::Utf16Be,
            "UTF-16LE" | "UTF16LE" => Self::Utf16Le,
            "UTF-16" | "UTF16" => Self::Utf16,
            "ISO-8859-1" | "ISO8859-1" | "LATIN1" => Self::Latin1,
            "US-ASCII" | "ASCII" => Self::Ascii,
            _ => return None,
        };
        Some(charset)
    }

    /// Charset used to read a body, falling back to UTF-8 for absent or
    /// unrecognised labels.
    #[must_use]
    pub fn for_decoding(label: Option<&str>) -> Self {
        label.and_then(Self::from_label).unwrap_or(Self::Utf8)
    }

    /// Canonical label written to the wire.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Utf16Be => "UTF-16BE",
            Self::Utf16Le => "UTF-16LE",
            Self::Utf16 => "UTF-16",
            Self::Latin1 => "ISO-8859-1",
            Self::Ascii => "US-ASCII",
        }
    }

    #[must_use]
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Self::Utf8 => text.as_bytes().to_vec(),
            Self::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            Self::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            Self::Utf16 => BOM_BE
                .into_iter()
                .chain(text.encode_utf16().flat_map(u16::to_be_bytes))
                .collect(),
            Self::Latin1 => narrow(text, 0xff),
            Self::Ascii => narrow(text, 0x7f),
        }
    }

    #[must_use]
    pub fn decode(self, raw: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(raw).into_owned(),
            Self::Utf16Be => widen(raw, u16::from_be_bytes),
            Self::Utf16Le => widen(raw, u16::from_le_bytes),
            Self::Utf16 => match raw {
                [0xff, 0xfe, rest @ ..] => widen(rest, u16::from_le_bytes),
                [0xfe, 0xff, rest @ ..] => widen(rest, u16::from_be_bytes),
                _ => widen(raw, u16::from_be_bytes),
            },
            Self::Latin1 => raw.iter().copied().map(char::from).collect(),
            Self::Ascii => raw
                .iter()
                .map(|&b| if b.is_ascii() { char::from(b) } else { char::REPLACEMENT_CHARACTER })
                .collect(),
        }
    }
}

fn narrow(text: &str, max: u32) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).ok().filter(|&b| u32::from(b) <= max).unwrap_or(b'?'))
        .collect()
}

fn widen(raw: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let chunks = raw.chunks_exact(2);
    let odd = !chunks.remainder().is_empty();
    let units = chunks.map(|pair| unit([pair[0], pair[1]]));
    let mut text: String = char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();
    if odd {
        text.push(char::REPLACEMENT_CHARACTER);
    }
    text
}
