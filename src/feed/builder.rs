use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use rss::{Channel, Guid, Item};
use tracing::debug;

use super::Site;
use crate::engine::Record;
use crate::error::Result;

/// Builds an RSS 2.0 channel for one site from extracted records.
#[derive(Debug, Clone)]
pub struct FeedBuilder {
    title: String,
    link: String,
    description: String,
    language: String,
    records: Vec<Record>,
}

impl FeedBuilder {
    /// Channel metadata comes from the site, falling back to the page's own
    /// `<title>` and meta description.
    pub fn new(site: &Site, page_title: Option<&str>, page_description: Option<&str>) -> Self {
        let title = site
            .title
            .clone()
            .or_else(|| page_title.map(str::to_string))
            .unwrap_or_else(|| site.name.clone());
        let description = site
            .description
            .clone()
            .or_else(|| page_description.map(str::to_string))
            .unwrap_or_default();

        Self {
            title,
            link: site.url.clone(),
            description,
            language: site.language.clone(),
            records: Vec::new(),
        }
    }

    pub fn records(mut self, records: Vec<Record>) -> Self {
        self.records = records;
        self
    }

    /// Oldest first; undated records lead, keeping their page order.
    fn sorted_records(&self) -> Vec<&Record> {
        let mut records: Vec<&Record> = self.records.iter().collect();
        records.sort_by_key(|record| record.date);
        records
    }

    fn item(record: &Record) -> Item {
        let mut item = Item::default();
        item.set_title(record.title.clone());
        item.set_description(record.title.clone());
        if let Some(link) = &record.link {
            item.set_link(link.clone());
            let mut guid = Guid::default();
            guid.set_value(link.clone());
            guid.set_permalink(true);
            item.set_guid(guid);
        }
        if let Some(date) = record.date {
            item.set_pub_date(date.to_rfc2822());
        }
        item
    }

    pub fn build(&self) -> Channel {
        let mut channel = Channel::default();
        channel.set_title(self.title.clone());
        channel.set_link(self.link.clone());
        channel.set_description(self.description.clone());
        channel.set_language(self.language.clone());
        channel.set_generator(format!("rss-scout {}", env!("CARGO_PKG_VERSION")));
        channel.set_items(
            self.sorted_records()
                .into_iter()
                .map(Self::item)
                .collect::<Vec<_>>(),
        );
        channel
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let channel = self.build();
        let writer = BufWriter::new(File::create(path)?);
        channel.pretty_write_to(writer, b' ', 2)?;
        debug!("Wrote {} items to {}", channel.items().len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SelectorSet;
    use chrono::{FixedOffset, TimeZone};

    fn site() -> Site {
        Site::new(
            "gdstc",
            "https://example.org/news/",
            "gdstc.xml",
            SelectorSet {
                container: "ul.list".to_string(),
                item: "li".to_string(),
                title: "a".to_string(),
                link: "a".to_string(),
                date: "span".to_string(),
            },
        )
    }

    fn record(title: &str, day: Option<u32>) -> Record {
        let offset = FixedOffset::east_opt(8 * 3600).unwrap();
        Record {
            title: title.to_string(),
            link: Some(format!("https://example.org/news/{}.html", title)),
            date: day.map(|d| offset.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()),
            raw_date_text: day.map(|d| format!("2024-01-{:02}", d)).unwrap_or_default(),
        }
    }

    #[test]
    fn test_channel_metadata_fallbacks() {
        let channel = FeedBuilder::new(&site(), Some("Notices"), None).build();

        assert_eq!(channel.title(), "Notices");
        assert_eq!(channel.link(), "https://example.org/news/");
        assert_eq!(channel.description(), "");
        assert_eq!(channel.language(), Some("zh-CN"));

        let mut named = site();
        named.title = Some("Custom".to_string());
        assert_eq!(FeedBuilder::new(&named, Some("Notices"), None).build().title(), "Custom");
    }

    #[test]
    fn test_items_sorted_by_date() {
        let channel = FeedBuilder::new(&site(), None, None)
            .records(vec![record("b", Some(2)), record("none", None), record("a", Some(1))])
            .build();

        let titles: Vec<&str> = channel.items().iter().filter_map(|i| i.title()).collect();
        assert_eq!(titles, vec!["none", "a", "b"]);
    }

    #[test]
    fn test_item_fields() {
        let channel = FeedBuilder::new(&site(), None, None)
            .records(vec![record("a", Some(15))])
            .build();
        let item = &channel.items()[0];

        assert_eq!(item.link(), Some("https://example.org/news/a.html"));
        assert_eq!(item.description(), Some("a"));
        assert_eq!(item.guid().map(|g| g.value()), Some("https://example.org/news/a.html"));
        assert!(item.guid().unwrap().is_permalink());
        assert_eq!(item.pub_date(), Some("Mon, 15 Jan 2024 00:00:00 +0800"));
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("feed.xml");

        FeedBuilder::new(&site(), Some("Notices"), None)
            .records(vec![record("a", Some(1))])
            .write_to(&path)
            .unwrap();

        let written = fs::read_to_string(&path).unwrap();
        let channel = Channel::read_from(written.as_bytes()).unwrap();
        assert_eq!(channel.items().len(), 1);
        assert_eq!(channel.title(), "Notices");
    }
}
