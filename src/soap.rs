//! Minimal SOAP 1.1 plumbing over quick-xml
//!
//! The SOAP banks expose a single document-style operation each, so a full
//! SOAP framework buys nothing: requests are built with the XML writer and
//! responses are read by element name, namespace prefixes ignored.

use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::{Error, Result};

/// SOAP 1.1 envelope namespace
pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

/// Wrap a body document in a SOAP 1.1 envelope. The body must not carry
/// its own XML declaration; the envelope provides it.
pub fn envelope(body: &str) -> String {
    format!(
        "{XML_DECL}<soapenv:Envelope xmlns:soapenv=\"{SOAP_ENV_NS}\"><soapenv:Body>{body}</soapenv:Body></soapenv:Envelope>"
    )
}

/// Wrap header and body documents in a SOAP 1.1 envelope
pub fn envelope_with_header(header: &str, body: &str) -> String {
    format!(
        "{XML_DECL}<soapenv:Envelope xmlns:soapenv=\"{SOAP_ENV_NS}\"><soapenv:Header>{header}</soapenv:Header><soapenv:Body>{body}</soapenv:Body></soapenv:Envelope>"
    )
}

/// Incremental XML document builder
pub struct XmlBuilder {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlBuilder {
    /// Builder without an XML declaration
    pub fn new() -> Self {
        XmlBuilder {
            writer: Writer::new(Cursor::new(Vec::new())),
        }
    }

    /// Builder starting with `<?xml version="1.0" encoding="UTF-8"?>`
    pub fn with_decl() -> Result<Self> {
        let mut b = XmlBuilder::new();
        b.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| Error::Xml(e.to_string()))?;
        Ok(b)
    }

    /// Open an element
    pub fn open(&mut self, tag: &str) -> Result<()> {
        self.writer
            .write_event(Event::Start(BytesStart::new(tag)))
            .map_err(|e| Error::Xml(e.to_string()))
    }

    /// Open an element carrying a default namespace declaration
    pub fn open_ns(&mut self, tag: &str, ns: &str) -> Result<()> {
        let mut start = BytesStart::new(tag);
        start.push_attribute(("xmlns", ns));
        self.writer
            .write_event(Event::Start(start))
            .map_err(|e| Error::Xml(e.to_string()))
    }

    /// Close an element
    pub fn close(&mut self, tag: &str) -> Result<()> {
        self.writer
            .write_event(Event::End(BytesEnd::new(tag)))
            .map_err(|e| Error::Xml(e.to_string()))
    }

    /// Write `<tag>text</tag>`, escaping the text
    pub fn leaf(&mut self, tag: &str, text: &str) -> Result<()> {
        self.open(tag)?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(|e| Error::Xml(e.to_string()))?;
        self.close(tag)
    }

    /// Finish and return the document string
    pub fn finish(self) -> Result<String> {
        String::from_utf8(self.writer.into_inner().into_inner())
            .map_err(|e| Error::Xml(e.to_string()))
    }
}

impl Default for XmlBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw inner content of the first `tag` element (child markup included),
/// namespace prefixes ignored
pub fn inner(xml: &str, tag: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == tag.as_bytes() => {
                return reader.read_text(e.name()).ok().map(|c| c.into_owned());
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// Raw inner content of every `tag` element, in document order
pub fn inner_all(xml: &str, tag: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == tag.as_bytes() => {
                if let Ok(text) = reader.read_text(e.name()) {
                    found.push(text.into_owned());
                }
            }
            Ok(Event::Eof) | Err(_) => return found,
            _ => {}
        }
    }
}

/// Unescaped text content of the first `tag` element
pub fn first_text(xml: &str, tag: &str) -> Option<String> {
    let raw = inner(xml, tag)?;
    let unescaped = quick_xml::escape::unescape(&raw)
        .map(|text| text.into_owned())
        .ok();
    Some(unescaped.unwrap_or(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_escapes_text() {
        let mut b = XmlBuilder::new();
        b.open("PAGADOR").unwrap();
        b.leaf("NOME", "Fulano & Filhos").unwrap();
        b.close("PAGADOR").unwrap();
        assert_eq!(
            b.finish().unwrap(),
            "<PAGADOR><NOME>Fulano &amp; Filhos</NOME></PAGADOR>"
        );
    }

    #[test]
    fn test_envelope_shape() {
        let env = envelope_with_header("<Chave/>", "<gerarBoletos/>");
        assert!(env.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?><soapenv:Envelope"));
        assert!(env.contains("<soapenv:Header><Chave/></soapenv:Header>"));
        assert!(env.contains("<soapenv:Body><gerarBoletos/></soapenv:Body>"));
        assert_eq!(env.matches("<?xml").count(), 1);
    }

    #[test]
    fn test_open_ns_declares_default_namespace() {
        let mut b = XmlBuilder::new();
        b.open_ns("Chave", "urn:exemplo").unwrap();
        b.leaf("token", "t").unwrap();
        b.close("Chave").unwrap();
        assert_eq!(
            b.finish().unwrap(),
            "<Chave xmlns=\"urn:exemplo\"><token>t</token></Chave>"
        );
    }

    #[test]
    fn test_inner_ignores_namespace_prefix() {
        let xml = "<ns2:RETORNO xmlns:ns2=\"urn:x\"><COD_RETORNO>0</COD_RETORNO></ns2:RETORNO>";
        assert_eq!(first_text(xml, "COD_RETORNO").as_deref(), Some("0"));
        assert_eq!(
            inner(xml, "RETORNO").as_deref(),
            Some("<COD_RETORNO>0</COD_RETORNO>")
        );
    }

    #[test]
    fn test_inner_all_collects_items() {
        let xml = "<erros><item><code>1</code></item><item><code>2</code></item></erros>";
        let items = inner_all(xml, "item");
        assert_eq!(items.len(), 2);
        assert_eq!(first_text(&items[1], "code").as_deref(), Some("2"));
    }

    #[test]
    fn test_first_text_unescapes() {
        let xml = "<RETORNO>CEP INV&#193;LIDO &amp; AUSENTE</RETORNO>";
        assert_eq!(
            first_text(xml, "RETORNO").as_deref(),
            Some("CEP INVÁLIDO & AUSENTE")
        );
    }
}
