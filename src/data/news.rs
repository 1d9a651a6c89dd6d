//! Headline ticker from an RSS feed.
//!
//! Unlike sparse candle data, a feed that does not parse as XML is a hard
//! failure for this fetch: there is no partial result worth showing, and
//! the error state tells the user the feed is down rather than silently
//! rendering an empty ticker.

use quick_xml::Reader;
use quick_xml::events::Event;
use serde::Serialize;

use crate::data::http::{FetchClient, FetchError};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Headline {
    pub title: String,
    pub link: String,
    pub published: String,
}

/// Which `<item>` child we are currently reading text for.
#[derive(PartialEq)]
enum ItemField {
    None,
    Title,
    Link,
    Published,
}

/// Walk an RSS document collecting `title`/`link`/`pubDate` per `<item>`.
///
/// Returns a detail string on malformed XML; the caller wraps it into the
/// InvalidBody error with the response context.
pub fn parse_rss(xml: &str) -> Result<Vec<Headline>, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    // Mismatched closing tags must fail, not degrade into an empty ticker
    reader.config_mut().check_end_names = true;

    let mut headlines = Vec::new();
    let mut in_item = false;
    let mut field = ItemField::None;
    let mut title = String::new();
    let mut link = String::new();
    let mut published = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"item" => {
                    in_item = true;
                    title.clear();
                    link.clear();
                    published.clear();
                }
                b"title" if in_item => field = ItemField::Title,
                b"link" if in_item => field = ItemField::Link,
                b"pubDate" if in_item => field = ItemField::Published,
                _ => {}
            },
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|e| e.to_string())?;
                match field {
                    ItemField::Title => title.push_str(&text),
                    ItemField::Link => link.push_str(&text),
                    ItemField::Published => published.push_str(&text),
                    ItemField::None => {}
                }
            }
            Ok(Event::CData(t)) => {
                // Feeds commonly CDATA-wrap titles
                let text = String::from_utf8_lossy(&t).to_string();
                match field {
                    ItemField::Title => title.push_str(&text),
                    ItemField::Link => link.push_str(&text),
                    ItemField::Published => published.push_str(&text),
                    ItemField::None => {}
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"item" => {
                    in_item = false;
                    if !title.trim().is_empty() {
                        headlines.push(Headline {
                            title: title.trim().to_string(),
                            link: link.trim().to_string(),
                            published: published.trim().to_string(),
                        });
                    }
                }
                b"title" | b"link" | b"pubDate" => field = ItemField::None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(format!("malformed XML: {}", e)),
        }
    }
    Ok(headlines)
}

/// Fetch the headline ticker.
pub async fn fetch_headlines(
    client: &FetchClient,
    base_url: &str,
) -> Result<Vec<Headline>, FetchError> {
    let raw = client.get_raw(base_url, &[]).await?;
    parse_rss(&raw.body).map_err(|detail| raw.invalid_body(detail))
}
