//! Rich-text clean-up.
//!
//! Host text is HTML produced by WYSIWYG editors while item documents are
//! strict XML. [`sanitize_html`] reads a fragment leniently and writes it back
//! as well-formed XML without presentation attributes. It never fails: the
//! part of a fragment that cannot be read as markup is exported as escaped
//! text after the markup read before it. Script and style blocks are dropped
//! with their content.

use std::borrow::Cow;
use std::sync::LazyLock;

use encoding_rs::{Encoding, WINDOWS_1252};
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use regex::Regex;
use tracing::{debug, warn};

use crate::common::into_string;

/// Elements that never have content and are always written self-closing.
pub const VOID_ELEMENTS: [&str; 11] = [
    "area", "br", "col", "embed", "hr", "img", "input", "param", "source", "track", "wbr",
];

/// Attributes removed from every element.
pub const STRIPPED_ATTRIBUTES: [&str; 3] = ["class", "style", "role"];

static SCRIPT_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>")
        .expect("Invalid script block regex")
});

/// Decode host bytes of unknown encoding into UTF-8 text.
///
/// A byte order mark wins; otherwise valid UTF-8 is taken as is and anything
/// else is read as Windows-1252, the usual encoding of legacy editor content.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    if let Some((encoding, bom_length)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_length..]);
        return text;
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            debug!("text is not UTF-8, decoding as windows-1252");
            WINDOWS_1252.decode_without_bom_handling(bytes).0
        }
    }
}

/// Clean an HTML fragment into well-formed XML markup.
pub fn sanitize_html(input: &str) -> String {
    if !input.contains(['<', '&']) {
        return escape_text(input);
    }
    let scriptless = SCRIPT_BLOCK_RE.replace_all(input, "");
    let repaired = escape_stray_brackets(&scriptless);
    match clean_fragment(&repaired) {
        Ok(markup) => markup,
        Err(error) => {
            warn!(%error, "markup could not be written, exporting it as text");
            escape_text(input)
        }
    }
}

fn clean_fragment(input: &str) -> Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(input);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.allow_dangling_amp = true;
    config.check_comments = false;

    let mut writer = Writer::new(Vec::new());
    let mut open: Vec<String> = Vec::new();
    let mut consumed = 0;
    loop {
        let event = match reader.read_event() {
            Ok(event) => {
                consumed = usize::try_from(reader.buffer_position()).unwrap_or(input.len());
                event
            }
            Err(error) => {
                let rest = input.get(consumed..).unwrap_or_default();
                warn!(
                    %error,
                    position = consumed,
                    "markup could not be parsed, exporting the rest as text"
                );
                let text = escape_text(&decode_entities(rest));
                writer.write_event(Event::Text(BytesText::from_escaped(text)))?;
                break;
            }
        };
        match event {
            Event::Start(start) => {
                let Some(name) = element_name(start.name().as_ref()) else {
                    continue;
                };
                let element = clean_start(&name, &start);
                if is_void(&name) {
                    writer.write_event(Event::Empty(element))?;
                } else {
                    writer.write_event(Event::Start(element))?;
                    open.push(name);
                }
            }
            Event::Empty(start) => {
                let Some(name) = element_name(start.name().as_ref()) else {
                    continue;
                };
                writer.write_event(Event::Empty(clean_start(&name, &start)))?;
            }
            Event::End(end) => {
                let Some(name) = element_name(end.name().as_ref()) else {
                    continue;
                };
                match open.iter().rposition(|candidate| *candidate == name) {
                    // Closing an outer element also closes everything opened inside it.
                    Some(index) => {
                        for name in open.drain(index..).rev() {
                            writer.write_event(Event::End(BytesEnd::new(name)))?;
                        }
                    }
                    None => debug!(element = %name, "dropping unmatched end tag"),
                }
            }
            Event::Text(text) => {
                let escaped = escape_text(&String::from_utf8_lossy(&text));
                writer.write_event(Event::Text(BytesText::from_escaped(escaped)))?;
            }
            Event::CData(data) => {
                let escaped = escape_text(&String::from_utf8_lossy(&data));
                writer.write_event(Event::Text(BytesText::from_escaped(escaped)))?;
            }
            Event::GeneralRef(reference) => {
                let markup = reference_markup(&String::from_utf8_lossy(&reference));
                writer.write_event(Event::Text(BytesText::from_escaped(markup)))?;
            }
            Event::Eof => break,
            // Comments, declarations and processing instructions carry no content.
            _ => {}
        }
    }
    for name in open.drain(..).rev() {
        writer.write_event(Event::End(BytesEnd::new(name)))?;
    }
    Ok(into_string(writer.into_inner()))
}

fn clean_start<'a>(name: &'a str, source: &BytesStart<'_>) -> BytesStart<'a> {
    let mut element = BytesStart::new(name);
    let mut seen: Vec<String> = Vec::new();
    let mut attributes = source.html_attributes();
    attributes.with_checks(false);
    for attribute in attributes {
        let Ok(attribute) = attribute else {
            break;
        };
        let Some(key) = attribute_name(attribute.key.as_ref()) else {
            continue;
        };
        if STRIPPED_ATTRIBUTES.contains(&key.as_str()) || seen.contains(&key) {
            continue;
        }
        let raw = String::from_utf8_lossy(&attribute.value);
        let decoded = decode_entities(&raw);
        element.push_attribute((key.as_str(), &*xml_chars(&decoded)));
        seen.push(key);
    }
    element
}

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// Lower-cased element name, or `None` for names XML cannot carry
/// unqualified (including editor namespaces such as `o:p`).
fn element_name(raw: &[u8]) -> Option<String> {
    let name = String::from_utf8_lossy(raw).to_ascii_lowercase();
    is_plain_name(&name).then_some(name)
}

fn attribute_name(raw: &[u8]) -> Option<String> {
    let name = String::from_utf8_lossy(raw).to_ascii_lowercase();
    (name == "xml:lang" || (is_plain_name(&name) && name != "xmlns")).then_some(name)
}

fn is_plain_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Escape `<` that cannot start a tag, so `1 < 2` survives as text.
fn escape_stray_brackets(input: &str) -> Cow<'_, str> {
    let mut out = String::new();
    let mut last = 0;
    for (index, _) in input.match_indices('<') {
        let next = input[index + 1..].chars().next();
        let starts_markup = next.is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?'));
        if !starts_markup {
            out.push_str(&input[last..index]);
            out.push_str("&lt;");
            last = index + 1;
        }
    }
    if last == 0 {
        return Cow::Borrowed(input);
    }
    out.push_str(&input[last..]);
    Cow::Owned(out)
}

/// Escape text content and drop characters XML 1.0 cannot represent.
pub(crate) fn escape_text(raw: &str) -> String {
    partial_escape(&*xml_chars(raw)).into_owned()
}

/// `raw` without the characters XML 1.0 cannot represent.
pub(crate) fn xml_chars(raw: &str) -> Cow<'_, str> {
    if raw.chars().all(is_xml_char) {
        Cow::Borrowed(raw)
    } else {
        Cow::Owned(raw.chars().filter(|c| is_xml_char(*c)).collect())
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// Markup for an entity reference found in text.
///
/// Known references become characters (non-ASCII as numeric references),
/// unknown ones are kept visible as literal text.
fn reference_markup(name: &str) -> String {
    match resolve_entity(name) {
        Some('&') => "&amp;".to_string(),
        Some('<') => "&lt;".to_string(),
        Some('>') => "&gt;".to_string(),
        Some(c) if !is_xml_char(c) => String::new(),
        Some(c) if c.is_ascii() => c.to_string(),
        Some(c) => format!("&#{};", u32::from(c)),
        None => format!("&amp;{};", escape_text(name)),
    }
}

/// Replace entity references in an attribute value by their characters.
fn decode_entities(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(position) = rest.find('&') {
        out.push_str(&rest[..position]);
        let tail = &rest[position + 1..];
        let resolved = tail
            .find(';')
            .and_then(|end| resolve_entity(&tail[..end]).map(|c| (end, c)));
        match resolved {
            Some((end, c)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn resolve_entity(name: &str) -> Option<char> {
    if let Some(code) = name.strip_prefix('#') {
        let value = match code.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        return value.and_then(char::from_u32);
    }
    html_entity(name)
}

/// Named character references found in editor output.
fn html_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "iexcl" => '¡',
        "cent" => '¢',
        "pound" => '£',
        "yen" => '¥',
        "euro" => '€',
        "sect" => '§',
        "copy" => '©',
        "laquo" => '«',
        "raquo" => '»',
        "shy" => '\u{ad}',
        "reg" => '®',
        "trade" => '™',
        "deg" => '°',
        "plusmn" => '±',
        "sup2" => '²',
        "sup3" => '³',
        "micro" => 'µ',
        "para" => '¶',
        "middot" => '·',
        "frac14" => '¼',
        "frac12" => '½',
        "frac34" => '¾',
        "iquest" => '¿',
        "times" => '×',
        "divide" => '÷',
        "Agrave" => 'À',
        "Aacute" => 'Á',
        "Auml" => 'Ä',
        "Aring" => 'Å',
        "AElig" => 'Æ',
        "Ccedil" => 'Ç',
        "Eacute" => 'É',
        "Ntilde" => 'Ñ',
        "Ouml" => 'Ö',
        "Oslash" => 'Ø',
        "Uuml" => 'Ü',
        "szlig" => 'ß',
        "agrave" => 'à',
        "aacute" => 'á',
        "acirc" => 'â',
        "auml" => 'ä',
        "aring" => 'å',
        "aelig" => 'æ',
        "ccedil" => 'ç',
        "egrave" => 'è',
        "eacute" => 'é',
        "ecirc" => 'ê',
        "iacute" => 'í',
        "ntilde" => 'ñ',
        "oacute" => 'ó',
        "ocirc" => 'ô',
        "ouml" => 'ö',
        "oslash" => 'ø',
        "uacute" => 'ú',
        "uuml" => 'ü',
        "alpha" => 'α',
        "beta" => 'β',
        "gamma" => 'γ',
        "delta" => 'δ',
        "Delta" => 'Δ',
        "epsilon" => 'ε',
        "theta" => 'θ',
        "lambda" => 'λ',
        "mu" => 'μ',
        "pi" => 'π',
        "sigma" => 'σ',
        "Sigma" => 'Σ',
        "omega" => 'ω',
        "Omega" => 'Ω',
        "ndash" => '–',
        "mdash" => '—',
        "lsquo" => '‘',
        "rsquo" => '’',
        "ldquo" => '“',
        "rdquo" => '”',
        "bull" => '•',
        "hellip" => '…',
        "larr" => '←',
        "uarr" => '↑',
        "rarr" => '→',
        "darr" => '↓',
        "harr" => '↔',
        "minus" => '−',
        "radic" => '√',
        "infin" => '∞',
        "ne" => '≠',
        "le" => '≤',
        "ge" => '≥',
        "asymp" => '≈',
        _ => return None,
    };
    Some(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_presentation_attributes() {
        let markup = sanitize_html(
            r#"<p class="x" style="color:red" role="note" lang="en">Hi <b STYLE="a">there</b></p>"#,
        );
        insta::assert_snapshot!(markup, @r#"<p lang="en">Hi <b>there</b></p>"#);
    }

    #[test]
    fn void_elements_are_self_closed() {
        let markup = sanitize_html(r#"line<br>next<img src="images/a.png" alt=x><hr></hr>"#);
        insta::assert_snapshot!(markup, @r#"line<br/>next<img src="images/a.png" alt="x"/><hr/>"#);
    }

    #[test]
    fn closes_open_elements_and_drops_stray_ends() {
        assert_eq!(sanitize_html("<p><b>bold</p></i>tail"), "<p><b>bold</b></p>tail");
        assert_eq!(sanitize_html("<div><p>open"), "<div><p>open</p></div>");
    }

    #[test]
    fn converts_named_entities() {
        assert_eq!(
            sanitize_html("a&nbsp;b &amp; &copy; &bogus; R&D"),
            "a&#160;b &amp; &#169; &amp;bogus; R&amp;D"
        );
    }

    #[test]
    fn keeps_comparisons_as_text() {
        assert_eq!(sanitize_html("<p>1 < 2</p>"), "<p>1 &lt; 2</p>");
        assert_eq!(sanitize_html("x <= y"), "x &lt;= y");
    }

    #[test]
    fn drops_editor_namespaces_and_comments() {
        assert_eq!(
            sanitize_html(r#"<p xmlns:o="urn:x">a<o:p></o:p><!-- note --></p>"#),
            "<p>a</p>"
        );
    }

    #[test]
    fn attribute_entities_are_reencoded() {
        assert_eq!(
            sanitize_html(r#"<a href="q?a=1&b=2&amp;c=&quot;3&quot;">x</a>"#),
            r#"<a href="q?a=1&amp;b=2&amp;c=&quot;3&quot;">x</a>"#
        );
    }

    #[test]
    fn unreadable_markup_becomes_text() {
        assert_eq!(sanitize_html("broken <b"), "broken &lt;b");
    }

    #[test]
    fn unreadable_tail_keeps_earlier_markup() {
        assert_eq!(
            sanitize_html("<p><b>bold</b> then 1 < 2 &amp; <i"),
            "<p><b>bold</b> then 1 &lt; 2 &amp; &lt;i</p>"
        );
    }

    #[test]
    fn script_and_style_blocks_are_dropped() {
        assert_eq!(
            sanitize_html("<p>a</p><script type=\"x\">if(a<b){}</script><STYLE>p{}</STYLE>b"),
            "<p>a</p>b"
        );
    }

    #[test]
    fn plain_text_is_escaped() {
        assert_eq!(sanitize_html("fish > chips\u{1}"), "fish &gt; chips");
    }

    #[test]
    fn decodes_legacy_encodings() {
        assert_eq!(decode_text("blå".as_bytes()), "blå");
        assert_eq!(decode_text(&[0x62, 0x6c, 0xe5]), "blå");
        assert_eq!(decode_text(&[0xef, 0xbb, 0xbf, b'o', b'k']), "ok");
        assert_eq!(decode_text(&[0xff, 0xfe, b'h', 0, b'i', 0]), "hi");
    }
}
