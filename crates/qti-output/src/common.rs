//! Shared constants and XML writing helpers.

use std::io::Write;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::Result;

/// QTI 2.1 namespace.
pub const QTI_NS: &str = "http://www.imsglobal.org/xsd/imsqti_v2p1";

/// QTI 2.1 schema location.
pub const QTI_SCHEMA_LOCATION: &str =
    "http://www.imsglobal.org/xsd/imsqti_v2p1 http://www.imsglobal.org/xsd/qti/qtiv2p1/imsqti_v2p1.xsd";

/// Inspera vendor extension namespace.
pub const INSPERA_NS: &str = "http://www.inspera.no/qti";

/// XML Schema instance namespace.
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// IMS content packaging namespace.
pub const IMSCP_NS: &str = "http://www.imsglobal.org/xsd/imscp_v1p1";

/// IMS learning object metadata namespace.
pub const IMSMD_NS: &str = "http://www.imsglobal.org/xsd/imsmd_v1p2";

/// Xalan java extension namespace, declared by the delivery platform's manifests.
pub const JAVA_NS: &str = "http://xml.apache.org/xalan/java";

/// Format tag of QTI 2.1 item resources.
pub const QTI_ITEM_RESOURCE_TYPE: &str = "imsqti_item_xmlv2p1";

/// Create an indenting writer over an in-memory buffer.
pub fn xml_writer() -> Writer<Vec<u8>> {
    Writer::new_with_indent(Vec::new(), b' ', 2)
}

/// Write the `<?xml version="1.0" encoding="UTF-8"?>` declaration.
pub fn write_declaration<W: Write>(writer: &mut Writer<W>) -> Result<()> {
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    Ok(())
}

/// Write a simple text element.
pub fn write_text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Write an element whose content is already well-formed markup.
///
/// Empty content produces a self-closing element.
pub fn write_markup_element<W: Write>(
    writer: &mut Writer<W>,
    start: BytesStart<'_>,
    markup: &str,
) -> Result<()> {
    if markup.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    let end = start.to_end().into_owned();
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Text(BytesText::from_escaped(markup)))?;
    writer.write_event(Event::End(end))?;
    Ok(())
}

/// Format a score or bound the way it appears in the document.
///
/// Shortest round-trip representation, integral values without a fraction.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        // Covers negative zero.
        "0".to_string()
    } else {
        value.to_string()
    }
}

/// Sum of two decimal operands, rounded to the decimal places they carry.
///
/// `1.1 + -0.2` is exactly `0.9` here rather than `0.9000000000000001`.
pub fn decimal_sum(a: f64, b: f64) -> f64 {
    let sum = a + b;
    if !sum.is_finite() {
        return sum;
    }
    let places = decimal_places(a).max(decimal_places(b));
    format!("{sum:.places$}").parse().unwrap_or(sum)
}

/// Digits after the point in the shortest representation of `value`.
fn decimal_places(value: f64) -> usize {
    value
        .to_string()
        .split_once('.')
        .map_or(0, |(_, fraction)| fraction.len())
}

/// Convert a writer buffer into a string.
pub(crate) fn into_string(buffer: Vec<u8>) -> String {
    String::from_utf8(buffer)
        .unwrap_or_else(|error| String::from_utf8_lossy(error.as_bytes()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_use_shortest_form() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(-2.0), "-2");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
    }

    #[test]
    fn decimal_sum_lands_on_decimal_values() {
        assert_eq!(format_number(decimal_sum(1.1, -0.2)), "0.9");
        assert_eq!(format_number(decimal_sum(1.1, 0.2)), "1.3");
        assert_eq!(format_number(decimal_sum(0.3, -0.1)), "0.2");
        assert_eq!(format_number(decimal_sum(1000.1, -1000.0)), "0.1");
        assert_eq!(format_number(decimal_sum(2.0, -0.5)), "1.5");
        assert_eq!(format_number(decimal_sum(1e-7, 2e-7)), "0.0000003");
    }

    #[test]
    fn markup_element_keeps_content_verbatim() {
        let mut writer = Writer::new(Vec::new());
        write_markup_element(&mut writer, BytesStart::new("div"), "<p>a &amp; b</p>").unwrap();
        write_markup_element(&mut writer, BytesStart::new("span"), "").unwrap();
        assert_eq!(
            into_string(writer.into_inner()),
            "<div><p>a &amp; b</p></div><span/>"
        );
    }
}
