use droidloc_core::{LocalizedEntry, ResourceDocument, Result};
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

const ROOT: &str = "resources";
const STRING: &str = "string";
const PLURALS: &str = "plurals";
const ITEM: &str = "item";

/// Serialize a document into Android `strings.xml` bytes.
pub fn render_resources(doc: &ResourceDocument) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_resources(&mut buf, doc)?;
    Ok(buf)
}

/// Write `doc` to `out_path`, creating missing parent directories.
pub fn write_resources_xml(out_path: &Path, doc: &ResourceDocument) -> Result<()> {
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(out_path)?;
    write_resources(BufWriter::new(file), doc)
}

/// Two-space indented, UTF-8, children in document order, plural items in
/// CLDR order. Same document in, same bytes out.
pub fn write_resources<W: Write>(out: W, doc: &ResourceDocument) -> Result<()> {
    let mut w = Writer::new_with_indent(out, b' ', 2);

    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    if doc.is_empty() {
        w.write_event(Event::Empty(BytesStart::new(ROOT)))?;
    } else {
        w.write_event(Event::Start(BytesStart::new(ROOT)))?;
        for entry in &doc.entries {
            match entry {
                LocalizedEntry::Simple { id, text } => {
                    let tag = BytesStart::new(STRING).with_attributes([("name", id.as_str())]);
                    write_text_element(&mut w, tag, STRING, text)?;
                }
                LocalizedEntry::Plural { id, items } => {
                    let tag = BytesStart::new(PLURALS).with_attributes([("name", id.as_str())]);
                    w.write_event(Event::Start(tag))?;
                    for (quantity, text) in items {
                        let item = BytesStart::new(ITEM)
                            .with_attributes([("quantity", quantity.as_str())]);
                        write_text_element(&mut w, item, ITEM, text)?;
                    }
                    w.write_event(Event::End(BytesEnd::new(PLURALS)))?;
                }
            }
        }
        w.write_event(Event::End(BytesEnd::new(ROOT)))?;
    }

    let mut inner = w.into_inner();
    inner.write_all(b"\n")?;
    inner.flush()?;
    Ok(())
}

// Empty text still produces an open/close pair rather than a self-closing tag.
fn write_text_element<W: Write>(
    w: &mut Writer<W>,
    start: BytesStart<'_>,
    name: &str,
    text: &str,
) -> Result<()> {
    w.write_event(Event::Start(start))?;
    w.write_event(Event::Text(BytesText::from_escaped(partial_escape(text))))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use droidloc_core::Quantity;
    use std::collections::BTreeMap;

    fn simple(id: &str, text: &str) -> LocalizedEntry {
        LocalizedEntry::Simple {
            id: id.into(),
            text: text.into(),
        }
    }

    fn plural(id: &str, items: &[(Quantity, &str)]) -> LocalizedEntry {
        LocalizedEntry::Plural {
            id: id.into(),
            items: items.iter().map(|(q, t)| (*q, t.to_string())).collect(),
        }
    }

    fn doc(entries: Vec<LocalizedEntry>) -> ResourceDocument {
        ResourceDocument {
            lang: "en".into(),
            entries,
        }
    }

    fn render_str(d: &ResourceDocument) -> String {
        String::from_utf8(render_resources(d).unwrap()).unwrap()
    }

    #[test]
    fn renders_pretty_android_resources() {
        let d = doc(vec![
            simple("greeting", "Hello"),
            plural(
                "items",
                &[(Quantity::Other, "%d items"), (Quantity::One, "1 item")],
            ),
        ]);
        let expected = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
<resources>\n  \
<string name=\"greeting\">Hello</string>\n  \
<plurals name=\"items\">\n    \
<item quantity=\"one\">1 item</item>\n    \
<item quantity=\"other\">%d items</item>\n  \
</plurals>\n\
</resources>\n";
        assert_eq!(render_str(&d), expected);
    }

    #[test]
    fn empty_document_is_bare_root() {
        let out = render_str(&doc(Vec::new()));
        let parsed = roxmltree::Document::parse(&out).unwrap();
        let root = parsed.root_element();
        assert_eq!(root.tag_name().name(), "resources");
        assert_eq!(root.attributes().count(), 0);
        assert_eq!(root.children().filter(|n| n.is_element()).count(), 0);
    }

    #[test]
    fn empty_text_is_kept() {
        let out = render_str(&doc(vec![simple("blank", "")]));
        assert!(out.contains("<string name=\"blank\"></string>"), "{out}");
    }

    #[test]
    fn absent_buckets_are_not_padded() {
        let out = render_str(&doc(vec![plural("n", &[(Quantity::Few, "a few")])]));
        let parsed = roxmltree::Document::parse(&out).unwrap();
        let items: Vec<_> = parsed
            .descendants()
            .filter(|n| n.has_tag_name("item"))
            .map(|n| n.attribute("quantity").unwrap().to_string())
            .collect();
        assert_eq!(items, vec!["few"]);
    }

    #[test]
    fn markup_characters_are_escaped() {
        let d = doc(vec![simple("a&b", "1 < 2 & \"quoted\" 'x'")]);
        let out = render_str(&d);
        let parsed = roxmltree::Document::parse(&out).unwrap();
        let node = parsed
            .descendants()
            .find(|n| n.has_tag_name("string"))
            .unwrap();
        assert_eq!(node.attribute("name"), Some("a&b"));
        assert_eq!(node.text(), Some("1 < 2 & \"quoted\" 'x'"));
        assert!(out.contains("1 &lt; 2 &amp; \"quoted\" 'x'"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let mut items = BTreeMap::new();
        for q in Quantity::ALL.into_iter().rev() {
            items.insert(q, q.as_str().to_uppercase());
        }
        let d = doc(vec![
            LocalizedEntry::Plural {
                id: "all".into(),
                items,
            },
            simple("z", "last"),
        ]);
        let a = render_resources(&d).unwrap();
        let b = render_resources(&d).unwrap();
        assert_eq!(a, b);

        let s = String::from_utf8(a).unwrap();
        let order: Vec<_> = Quantity::ALL
            .iter()
            .map(|q| s.find(&format!("quantity=\"{q}\"")).unwrap())
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn writes_file_and_creates_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("res").join("values-fr").join("strings.xml");
        let d = doc(vec![simple("greeting", "Bonjour")]);

        write_resources_xml(&path, &d).unwrap();
        let first = fs::read(&path).unwrap();
        write_resources_xml(&path, &d).unwrap();
        let second = fs::read(&path).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, render_resources(&d).unwrap());
    }
}
