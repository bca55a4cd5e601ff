//! IMS content package manifest.

use std::io::Write;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::common::{
    IMSCP_NS, IMSMD_NS, JAVA_NS, QTI_ITEM_RESOURCE_TYPE, write_declaration, xml_writer,
};
use crate::error::Result;

/// File name of the manifest at the archive root.
pub const MANIFEST_PATH: &str = "imsmanifest.xml";

/// One emitted item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub identifier: String,
    /// Format tag, always `imsqti_item_xmlv2p1`.
    pub resource_type: &'static str,
    pub href: String,
    pub title: String,
}

/// Running index of the items written to an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
    title_language: String,
}

impl Manifest {
    pub fn new(title_language: impl Into<String>) -> Self {
        Self {
            entries: Vec::new(),
            title_language: title_language.into(),
        }
    }

    /// Append an entry. Registering the same item twice lists it twice.
    pub fn register(
        &mut self,
        identifier: impl Into<String>,
        href: impl Into<String>,
        title: impl Into<String>,
    ) {
        self.entries.push(ManifestEntry {
            identifier: identifier.into(),
            resource_type: QTI_ITEM_RESOURCE_TYPE,
            href: href.into(),
            title: title.into(),
        });
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the manifest document.
    pub fn to_xml(&self) -> Result<Vec<u8>> {
        let mut writer = xml_writer();
        write_declaration(&mut writer)?;

        let mut root = BytesStart::new("manifest");
        root.push_attribute(("xmlns", IMSCP_NS));
        root.push_attribute(("xmlns:java", JAVA_NS));
        root.push_attribute(("xmlns:imsmd", IMSMD_NS));
        root.push_attribute(("identifier", "MANIFEST"));
        root.push_attribute(("version", "1.1"));
        writer.write_event(Event::Start(root))?;

        writer.write_event(Event::Start(BytesStart::new("metadata")))?;
        open(&mut writer, &["imsmd:lom", "imsmd:lifecycle", "imsmd:status"])?;
        open(&mut writer, &["imsmd:source"])?;
        write_langstring(&mut writer, "x-none", "LOMv1.0")?;
        close(&mut writer, &["imsmd:source"])?;
        open(&mut writer, &["imsmd:value"])?;
        write_langstring(&mut writer, "x-none", "Draft")?;
        close(&mut writer, &["imsmd:value"])?;
        close(&mut writer, &["imsmd:lom", "imsmd:lifecycle", "imsmd:status"])?;
        writer.write_event(Event::End(BytesEnd::new("metadata")))?;

        writer.write_event(Event::Empty(BytesStart::new("organizations")))?;

        if self.entries.is_empty() {
            writer.write_event(Event::Empty(BytesStart::new("resources")))?;
        } else {
            writer.write_event(Event::Start(BytesStart::new("resources")))?;
            for entry in &self.entries {
                self.write_resource(&mut writer, entry)?;
            }
            writer.write_event(Event::End(BytesEnd::new("resources")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("manifest")))?;
        Ok(writer.into_inner())
    }

    fn write_resource<W: Write>(&self, writer: &mut Writer<W>, entry: &ManifestEntry) -> Result<()> {
        let mut resource = BytesStart::new("resource");
        resource.push_attribute(("identifier", entry.identifier.as_str()));
        resource.push_attribute(("type", entry.resource_type));
        resource.push_attribute(("href", entry.href.as_str()));
        writer.write_event(Event::Start(resource))?;

        writer.write_event(Event::Start(BytesStart::new("metadata")))?;
        open(writer, &["imsmd:lom", "imsmd:general", "imsmd:title"])?;
        write_langstring(writer, &self.title_language, &entry.title)?;
        close(writer, &["imsmd:lom", "imsmd:general", "imsmd:title"])?;
        writer.write_event(Event::End(BytesEnd::new("metadata")))?;

        let mut file = BytesStart::new("file");
        file.push_attribute(("href", entry.href.as_str()));
        writer.write_event(Event::Empty(file))?;

        writer.write_event(Event::End(BytesEnd::new("resource")))?;
        Ok(())
    }
}

fn open<W: Write>(writer: &mut Writer<W>, names: &[&str]) -> Result<()> {
    for name in names {
        writer.write_event(Event::Start(BytesStart::new(*name)))?;
    }
    Ok(())
}

/// Close `names`, innermost last in the slice.
fn close<W: Write>(writer: &mut Writer<W>, names: &[&str]) -> Result<()> {
    for name in names.iter().rev() {
        writer.write_event(Event::End(BytesEnd::new(*name)))?;
    }
    Ok(())
}

fn write_langstring<W: Write>(writer: &mut Writer<W>, language: &str, text: &str) -> Result<()> {
    let mut start = BytesStart::new("imsmd:langstring");
    start.push_attribute(("xml:lang", language));
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new("imsmd:langstring")))?;
    Ok(())
}
