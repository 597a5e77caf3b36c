use std::io::{Cursor, Read, Write};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::OoxmlError;
use crate::xml::XmlDocument;

#[derive(Debug, Clone)]
struct Part {
    name: String,
    data: Vec<u8>,
}

/// A zip package held in memory as an ordered list of parts.
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: Vec<Part>,
}

impl Package {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads every file entry of the archive. Directory entries are skipped.
    pub fn read(bytes: &[u8]) -> Result<Self, OoxmlError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            parts.push(Part {
                name: file.name().to_string(),
                data,
            });
        }
        log::debug!("Read package with {} parts", parts.len());
        Ok(Self { parts })
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|p| p.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parts.iter().any(|p| p.name == name)
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.data.as_slice())
    }

    /// Replaces a part's bytes, or appends a new part at the end.
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.parts.iter_mut().find(|p| p.name == name) {
            Some(part) => part.data = data,
            None => self.parts.push(Part {
                name: name.to_string(),
                data,
            }),
        }
    }

    /// Returns `true` if a part was removed.
    pub fn remove_part(&mut self, name: &str) -> bool {
        let before = self.parts.len();
        self.parts.retain(|p| p.name != name);
        self.parts.len() != before
    }

    /// Parses a part into an XML tree.
    pub fn xml_part(&self, name: &str) -> Result<XmlDocument, OoxmlError> {
        let data = self
            .part(name)
            .ok_or_else(|| OoxmlError::MissingPart(name.to_string()))?;
        XmlDocument::parse_bytes(data).map_err(|e| match e {
            OoxmlError::Malformed { message, .. } => OoxmlError::Malformed {
                part: name.to_string(),
                message,
            },
            other => OoxmlError::Malformed {
                part: name.to_string(),
                message: other.to_string(),
            },
        })
    }

    pub fn set_xml_part(&mut self, name: &str, doc: &XmlDocument) {
        self.set_part(name, doc.to_bytes());
    }

    /// Writes the package back out, parts in their original order.
    pub fn to_bytes(&self) -> Result<Vec<u8>, OoxmlError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options: FileOptions<'_, ()> =
            FileOptions::default().compression_method(CompressionMethod::Deflated);
        for part in &self.parts {
            zip.start_file(part.name.as_str(), options)?;
            zip.write_all(&part.data)?;
        }
        Ok(zip.finish()?.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut package = Package::new();
        for (name, body) in entries {
            package.set_part(name, body.as_bytes().to_vec());
        }
        package.to_bytes().unwrap()
    }

    #[test]
    fn test_read_preserves_order_and_bytes() {
        let bytes = build(&[
            ("[Content_Types].xml", "<Types/>"),
            ("word/document.xml", "<w:document/>"),
            ("word/media/image1.png", "\u{0}\u{1}binary"),
        ]);
        let package = Package::read(&bytes).unwrap();
        let names: Vec<&str> = package.part_names().collect();
        assert_eq!(
            names,
            vec!["[Content_Types].xml", "word/document.xml", "word/media/image1.png"]
        );
        assert_eq!(
            package.part("word/media/image1.png"),
            Some("\u{0}\u{1}binary".as_bytes())
        );
    }

    #[test]
    fn test_xml_part_roundtrip_through_package() {
        let bytes = build(&[("a.xml", "<a><b>x</b></a>"), ("b.bin", "raw")]);
        let mut package = Package::read(&bytes).unwrap();
        let mut doc = package.xml_part("a.xml").unwrap();
        let root = doc.root_element().unwrap();
        let b = doc.first_child_named(root, "b").unwrap();
        doc.set_text(b, "y");
        package.set_xml_part("a.xml", &doc);

        let reread = Package::read(&package.to_bytes().unwrap()).unwrap();
        let text = String::from_utf8(reread.part("a.xml").unwrap().to_vec()).unwrap();
        assert!(text.ends_with("<a><b>y</b></a>"));
        assert_eq!(reread.part("b.bin"), Some(&b"raw"[..]));
    }

    #[test]
    fn test_remove_part() {
        let mut package = Package::read(&build(&[("a.xml", "<a/>"), ("b.xml", "<b/>")])).unwrap();
        assert!(package.remove_part("a.xml"));
        assert!(!package.remove_part("a.xml"));
        assert_eq!(package.part_names().collect::<Vec<_>>(), vec!["b.xml"]);
    }

    #[test]
    fn test_missing_and_malformed_parts() {
        let bytes = build(&[("bad.xml", "<a><b></a>")]);
        let package = Package::read(&bytes).unwrap();
        assert!(matches!(
            package.xml_part("nope.xml"),
            Err(OoxmlError::MissingPart(_))
        ));
        assert!(matches!(
            package.xml_part("bad.xml"),
            Err(OoxmlError::Malformed { ref part, .. }) if part == "bad.xml"
        ));
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(
            Package::read(b"definitely not a zip"),
            Err(OoxmlError::Zip(_))
        ));
    }
}
