// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Multi-status listing bodies.
//!
//! A depth-one property listing answers with a `207 Multi-Status` body whose
//! root `multistatus` element holds one `response` element per entry. Each
//! `response` names its entry through an `href` element. All of these live in
//! the `DAV:` namespace, whatever prefix the server chose for it.

use crate::remote::RemoteEntry;

use roxmltree::Document;

/// Namespace of every element in a multi-status body.
pub const DAV_NAMESPACE: &str = "DAV:";

/// Request body asking for nothing but the resource type of each entry.
pub const PROPFIND_BODY: &str = concat!(
    "<?xml version=\"1.0\"?>\n",
    "<a:propfind xmlns:a=\"DAV:\">\n",
    "   <a:prop>\n",
    "       <a:resourcetype/>\n",
    "   </a:prop>\n",
    "</a:propfind>\n",
);

/// Extract entries of a multi-status body in document order.
///
/// Only `href` elements that are direct children of a `response` element,
/// which itself is a direct child of the root, are considered.
///
/// # Errors
///
/// - Return [`roxmltree::Error`] if body is not well-formed XML.
pub fn parse_entries(body: &str) -> Result<Vec<RemoteEntry>, roxmltree::Error> {
    let document = Document::parse(body.trim())?;
    let entries = document
        .root_element()
        .children()
        .filter(|node| node.has_tag_name((DAV_NAMESPACE, "response")))
        .flat_map(|response| {
            response
                .children()
                .filter(|node| node.has_tag_name((DAV_NAMESPACE, "href")))
        })
        .map(|href| RemoteEntry::new(href.text().unwrap_or_default().trim()))
        .collect();

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_prefixed_namespace() -> anyhow::Result<()> {
        let body = indoc! {r#"
            <?xml version="1.0" encoding="UTF-8"?>
            <d:multistatus xmlns:d="DAV:">
              <d:response>
                <d:href>/on/demandware.servlet/webdav/Sites/Cartridges/version1/</d:href>
                <d:propstat><d:prop><d:resourcetype><d:collection/></d:resourcetype></d:prop></d:propstat>
              </d:response>
              <d:response>
                <d:href>/on/demandware.servlet/webdav/Sites/Cartridges/version1/a.txt</d:href>
              </d:response>
              <d:response>
                <d:href>/on/demandware.servlet/webdav/Sites/Cartridges/version1/b/</d:href>
              </d:response>
            </d:multistatus>
        "#};

        let result = parse_entries(body)?;
        let expect = vec![
            RemoteEntry::new("/on/demandware.servlet/webdav/Sites/Cartridges/version1/"),
            RemoteEntry::new("/on/demandware.servlet/webdav/Sites/Cartridges/version1/a.txt"),
            RemoteEntry::new("/on/demandware.servlet/webdav/Sites/Cartridges/version1/b/"),
        ];
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn parse_default_namespace() -> anyhow::Result<()> {
        let body = indoc! {r#"
            <multistatus xmlns="DAV:">
              <response><href>/self/</href></response>
              <response><href>/self/x</href></response>
            </multistatus>
        "#};

        let result = parse_entries(body)?;
        let expect = vec![RemoteEntry::new("/self/"), RemoteEntry::new("/self/x")];
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn ignore_elements_outside_dav_namespace() -> anyhow::Result<()> {
        let body = indoc! {r#"
            <d:multistatus xmlns:d="DAV:" xmlns:x="urn:other">
              <d:response><d:href>/self/</d:href><x:href>/bogus</x:href></d:response>
              <x:response><d:href>/also-bogus</d:href></x:response>
              <d:response><d:href>/self/kept</d:href></d:response>
            </d:multistatus>
        "#};

        let result = parse_entries(body)?;
        let expect = vec![RemoteEntry::new("/self/"), RemoteEntry::new("/self/kept")];
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn reject_malformed_body() {
        assert!(parse_entries("<d:multistatus xmlns:d=\"DAV:\"><d:response>").is_err());
        assert!(parse_entries("not xml at all").is_err());
    }
}
