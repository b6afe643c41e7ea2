//! Note model and display helpers.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::Envelope;

/// Longest title derived from content.
const TITLE_MAX_CHARS: usize = 50;

/// Longest preview before an ellipsis is appended.
const PREVIEW_MAX_CHARS: usize = 100;

pub const UNTITLED: &str = "Untitled Note";

/// Editing mode of a note.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteMode {
    #[default]
    Text,
    Whiteboard,
}

/// A single note.
///
/// `content` is blank while the note-layer envelope (`ciphertext` + `nonce`)
/// holds the real body; see [`Note::note_envelope`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated: DateTime<Utc>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub encrypted: bool,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub mode: NoteMode,
    #[serde(default)]
    pub whiteboard_data: Option<serde_json::Value>,
    #[serde(default)]
    pub ciphertext: Option<String>,
    #[serde(default)]
    pub nonce: Option<String>,
}

impl Note {
    /// Create a fresh note with a random id.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            content: content.into(),
            tags: Vec::new(),
            folder: None,
            created: now,
            updated: now,
            favorite: false,
            encrypted: false,
            color: None,
            mode: NoteMode::Text,
            whiteboard_data: None,
            ciphertext: None,
            nonce: None,
        }
    }

    /// Builder-style tag setter.
    pub fn with_tags<S: AsRef<str>>(mut self, tags: &[S]) -> Self {
        self.set_tags(tags);
        self
    }

    /// Replace the tags, trimming blanks and dropping duplicates in order.
    pub fn set_tags<S: AsRef<str>>(&mut self, tags: &[S]) {
        let mut out: Vec<String> = Vec::with_capacity(tags.len());
        for tag in tags {
            let tag = tag.as_ref().trim();
            if !tag.is_empty() && !out.iter().any(|t| t == tag) {
                out.push(tag.to_string());
            }
        }
        self.tags = out;
    }

    /// Mark the note as modified now.
    pub fn touch(&mut self) {
        self.updated = Utc::now();
    }

    /// Move to `folder`. Blank means the root.
    pub fn set_folder(&mut self, folder: Option<&str>) {
        self.folder = folder
            .map(|f| f.trim().trim_matches('/'))
            .filter(|f| !f.is_empty())
            .map(str::to_string);
    }

    /// Set or clear the highlight colour.
    pub fn set_color(&mut self, color: Option<&str>) {
        self.color = color
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
    }

    /// Whether the note sits in `folder` or one of its subfolders.
    pub fn in_folder(&self, folder: &str) -> bool {
        let folder = folder.trim().trim_matches('/');
        match self.folder.as_deref() {
            Some(own) => {
                own == folder
                    || (own.starts_with(folder) && own[folder.len()..].starts_with('/'))
            }
            None => folder.is_empty(),
        }
    }

    /// The note-layer envelope, only when the note is flagged encrypted and
    /// both halves are present. Anything else is plaintext fallback.
    pub fn note_envelope(&self) -> Option<Envelope> {
        if !self.encrypted {
            return None;
        }
        match (&self.ciphertext, &self.nonce) {
            (Some(ciphertext), Some(nonce)) if !ciphertext.is_empty() && !nonce.is_empty() => {
                Some(Envelope {
                    ciphertext: ciphertext.clone(),
                    nonce: nonce.clone(),
                })
            }
            _ => None,
        }
    }

    /// Title to display: the explicit title, else one derived from content.
    pub fn display_title(&self) -> String {
        extract_title(&self.title, &self.content)
    }

    /// Serialize as markdown with a frontmatter header.
    pub fn to_markdown(&self) -> String {
        let tags = self
            .tags
            .iter()
            .map(|t| format!("\"{}\"", t))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "---\nid: {}\ncreated: {}\nupdated: {}\nencrypted: {}\ntags: [{}]\n---\n\n{}",
            self.id,
            self.created.to_rfc3339(),
            self.updated.to_rfc3339(),
            self.encrypted,
            tags,
            self.content
        )
    }

    /// Parse markdown produced by [`Note::to_markdown`].
    ///
    /// Input without a frontmatter block becomes a new note whose content is
    /// the whole text. Unparseable timestamps fall back to now.
    pub fn from_markdown(markdown: &str) -> Self {
        let Some((header, body)) = split_frontmatter(markdown) else {
            return Note::new("", markdown);
        };

        let mut note = Note::new("", body.strip_prefix('\n').unwrap_or(body));
        for line in header.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "id" if !value.is_empty() => note.id = value.to_string(),
                "created" => {
                    if let Some(ts) = parse_timestamp(value) {
                        note.created = ts;
                    }
                }
                "updated" => {
                    if let Some(ts) = parse_timestamp(value) {
                        note.updated = ts;
                    }
                }
                "encrypted" => note.encrypted = value == "true",
                "tags" => {
                    let tags: Vec<String> = value
                        .trim_start_matches('[')
                        .trim_end_matches(']')
                        .split(',')
                        .map(|t| t.trim().replace('"', ""))
                        .collect();
                    note.set_tags(&tags);
                }
                "title" => note.title = value.to_string(),
                _ => {}
            }
        }
        note
    }
}

fn split_frontmatter(markdown: &str) -> Option<(&str, &str)> {
    let rest = markdown.strip_prefix("---\n")?;
    let end = rest.find("\n---\n")?;
    Some((&rest[..end], &rest[end + "\n---\n".len()..]))
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Strip tags and the common entities from HTML content.
fn strip_html(content: &str) -> String {
    let mut text = String::with_capacity(content.len());
    let mut in_tag = false;
    for c in content.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

fn is_html(content: &str) -> bool {
    content.trim_start().starts_with('<')
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

/// Pick a title: the explicit one if set, else the first HTML text line,
/// markdown heading or non-empty line of `content`.
pub fn extract_title(title: &str, content: &str) -> String {
    let title = title.trim();
    if !title.is_empty() {
        return title.to_string();
    }

    if is_html(content) {
        let text = strip_html(content);
        return text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(|line| truncate_chars(line, TITLE_MAX_CHARS))
            .unwrap_or_default();
    }

    for line in content.lines() {
        let hashes = line.chars().take_while(|c| *c == '#').count();
        if hashes > 0 {
            let rest = &line[hashes..];
            if rest.starts_with(char::is_whitespace) && !rest.trim().is_empty() {
                return rest.trim().to_string();
            }
        }
        if !line.trim().is_empty() {
            return truncate_chars(line.trim(), TITLE_MAX_CHARS);
        }
    }
    UNTITLED.to_string()
}

/// Single-line plain-text preview of note content.
pub fn preview_text(content: &str) -> String {
    if content.is_empty() {
        return String::new();
    }
    let text = if is_html(content) {
        strip_html(content)
    } else {
        content.to_string()
    };
    let cleaned: String = text.chars().filter(|c| !matches!(c, '#' | '*' | '`')).collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() > PREVIEW_MAX_CHARS {
        format!("{}...", truncate_chars(&collapsed, PREVIEW_MAX_CHARS))
    } else {
        collapsed
    }
}

/// Ordering for note listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    /// Creation time, newest first.
    #[default]
    Date,
    /// Display title, case-insensitive.
    Alphabetical,
    /// Favorites first, then by creation time.
    Favorites,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Desc,
    Asc,
}

/// How a listing is split into sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    Date,
    Tags,
    Folders,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChoice {
    pub what: &'static str,
    pub value: String,
    pub expected: &'static str,
}

impl fmt::Display for UnknownChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unknown {} '{}'. Expected one of: {}",
            self.what, self.value, self.expected
        )
    }
}

impl std::error::Error for UnknownChoice {}

impl FromStr for SortBy {
    type Err = UnknownChoice;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "date" => Ok(SortBy::Date),
            "alphabetical" | "title" => Ok(SortBy::Alphabetical),
            "favorites" => Ok(SortBy::Favorites),
            _ => Err(UnknownChoice {
                what: "sort",
                value: value.to_string(),
                expected: "date, alphabetical, favorites",
            }),
        }
    }
}

impl FromStr for SortOrder {
    type Err = UnknownChoice;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "desc" => Ok(SortOrder::Desc),
            "asc" => Ok(SortOrder::Asc),
            _ => Err(UnknownChoice {
                what: "sort order",
                value: value.to_string(),
                expected: "asc, desc",
            }),
        }
    }
}

impl FromStr for Grouping {
    type Err = UnknownChoice;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "date" => Ok(Grouping::Date),
            "tags" => Ok(Grouping::Tags),
            "folders" => Ok(Grouping::Folders),
            _ => Err(UnknownChoice {
                what: "grouping",
                value: value.to_string(),
                expected: "date, tags, folders",
            }),
        }
    }
}

/// Sort `notes` in place. Ties keep their input order.
pub fn sort_notes(notes: &mut [Note], by: SortBy, order: SortOrder) {
    match by {
        SortBy::Date => notes.sort_by(|a, b| b.created.cmp(&a.created)),
        SortBy::Alphabetical => notes.sort_by_cached_key(|note| note.display_title().to_lowercase()),
        SortBy::Favorites => notes.sort_by(|a, b| {
            b.favorite
                .cmp(&a.favorite)
                .then_with(|| b.created.cmp(&a.created))
        }),
    }
    if order == SortOrder::Asc {
        notes.reverse();
    }
}

/// Labelled sections of a listing, in display order.
pub type Groups = Vec<(String, Vec<Note>)>;

pub const UNTAGGED: &str = "Untagged";

/// Split by `updated` into Today, This Week, This Month and Older, relative
/// to `now`. Empty sections are dropped.
pub fn group_by_date(notes: &[Note], now: DateTime<Utc>) -> Groups {
    let today = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now);
    let week_ago = today - chrono::Duration::days(7);
    let month_ago = today.checked_sub_months(Months::new(1)).unwrap_or(week_ago);

    let mut groups: Groups = ["Today", "This Week", "This Month", "Older"]
        .iter()
        .map(|label| (label.to_string(), Vec::new()))
        .collect();
    for note in notes {
        let slot = if note.updated >= today {
            0
        } else if note.updated >= week_ago {
            1
        } else if note.updated >= month_ago {
            2
        } else {
            3
        };
        groups[slot].1.push(note.clone());
    }
    groups.retain(|(_, notes)| !notes.is_empty());
    groups
}

/// One section per tag, alphabetical, with untagged notes last. A note with
/// several tags appears in each of them.
pub fn group_by_tags(notes: &[Note]) -> Groups {
    let mut tagged: BTreeMap<String, Vec<Note>> = BTreeMap::new();
    let mut untagged = Vec::new();
    for note in notes {
        if note.tags.is_empty() {
            untagged.push(note.clone());
        }
        for tag in &note.tags {
            tagged.entry(tag.clone()).or_default().push(note.clone());
        }
    }
    let mut groups: Groups = tagged.into_iter().collect();
    if !untagged.is_empty() {
        groups.push((UNTAGGED.to_string(), untagged));
    }
    groups
}

/// One section per folder path, root (`""`) first, then alphabetical.
pub fn group_by_folders(notes: &[Note]) -> Groups {
    let mut folders: BTreeMap<String, Vec<Note>> = BTreeMap::new();
    for note in notes {
        folders
            .entry(note.folder.clone().unwrap_or_default())
            .or_default()
            .push(note.clone());
    }
    // BTreeMap already orders "" before every other path.
    folders.into_iter().collect()
}

/// Last path segment, or `Root` for the root folder.
pub fn folder_display_name(path: &str) -> &str {
    let path = path.trim_matches('/');
    if path.is_empty() {
        return "Root";
    }
    path.rsplit('/').next().unwrap_or(path)
}

/// Parent of a folder path. `None` for the root and top-level folders.
pub fn parent_folder(path: &str) -> Option<&str> {
    let path = path.trim_matches('/');
    path.rsplit_once('/').map(|(parent, _)| parent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_deduplicated_in_order() {
        let note = Note::new("t", "c").with_tags(&["work", " home ", "work", "", "urgent"]);
        assert_eq!(note.tags, vec!["work", "home", "urgent"]);
    }

    #[test]
    fn test_note_envelope_requires_both_halves() {
        let mut note = Note::new("t", "");
        note.encrypted = true;
        note.ciphertext = Some("abc".into());
        assert!(note.note_envelope().is_none());

        note.nonce = Some("def".into());
        assert!(note.note_envelope().is_some());

        note.encrypted = false;
        assert!(note.note_envelope().is_none());
    }

    #[test]
    fn test_extract_title_prefers_explicit() {
        assert_eq!(extract_title("  Plans ", "# Heading"), "Plans");
    }

    #[test]
    fn test_extract_title_from_markdown_heading() {
        assert_eq!(extract_title("", "\n## Weekly review\nbody"), "Weekly review");
    }

    #[test]
    fn test_extract_title_from_html() {
        assert_eq!(
            extract_title("", "<p>Fish &amp; chips</p>\n<p>second</p>"),
            "Fish & chips"
        );
    }

    #[test]
    fn test_extract_title_caps_length() {
        let long = "x".repeat(80);
        assert_eq!(extract_title("", &long).len(), 50);
    }

    #[test]
    fn test_extract_title_untitled() {
        assert_eq!(extract_title("", "  \n \n"), UNTITLED);
    }

    #[test]
    fn test_preview_text() {
        assert_eq!(preview_text("# Title\n\n**bold**   text"), "Title bold text");
        let long = "word ".repeat(40);
        let preview = preview_text(&long);
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), 103);
    }

    #[test]
    fn test_markdown_round_trip_keeps_fields() {
        let mut note = Note::new("", "# Hello\nbody text").with_tags(&["a", "b"]);
        note.encrypted = false;
        let parsed = Note::from_markdown(&note.to_markdown());
        assert_eq!(parsed.id, note.id);
        assert_eq!(parsed.content, note.content);
        assert_eq!(parsed.tags, note.tags);
        assert_eq!(parsed.created.timestamp(), note.created.timestamp());
    }

    #[test]
    fn test_from_markdown_without_frontmatter() {
        let note = Note::from_markdown("just text");
        assert_eq!(note.content, "just text");
        assert!(!note.id.is_empty());
    }

    #[test]
    fn test_legacy_json_deserializes_with_defaults() {
        let json = r#"{"id":"n1","title":"Old","content":"body","whiteboardData":null}"#;
        let note: Note = serde_json::from_str(json).unwrap();
        assert_eq!(note.id, "n1");
        assert_eq!(note.mode, NoteMode::Text);
        assert!(note.tags.is_empty());
        assert!(!note.encrypted);
    }

    fn dated(title: &str, days_ago: i64) -> Note {
        let mut note = Note::new(title, "body");
        note.created = Utc::now() - chrono::Duration::days(days_ago);
        note.updated = note.created;
        note
    }

    #[test]
    fn test_set_folder_and_color_normalize_blanks() {
        let mut note = Note::new("t", "c");
        note.set_folder(Some(" /work/reports/ "));
        assert_eq!(note.folder.as_deref(), Some("work/reports"));
        note.set_folder(Some("  "));
        assert!(note.folder.is_none());

        note.set_color(Some("yellow"));
        assert_eq!(note.color.as_deref(), Some("yellow"));
        note.set_color(Some(""));
        assert!(note.color.is_none());
    }

    #[test]
    fn test_in_folder_includes_subfolders_only() {
        let mut note = Note::new("t", "c");
        note.set_folder(Some("work/reports"));
        assert!(note.in_folder("work"));
        assert!(note.in_folder("work/reports"));
        assert!(!note.in_folder("wor"));
        assert!(!note.in_folder("home"));
        assert!(Note::new("t", "c").in_folder(""));
    }

    #[test]
    fn test_sort_by_date_and_reverse() {
        let mut notes = vec![dated("mid", 2), dated("new", 0), dated("old", 5)];
        sort_notes(&mut notes, SortBy::Date, SortOrder::Desc);
        let titles: Vec<_> = notes.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["new", "mid", "old"]);

        sort_notes(&mut notes, SortBy::Date, SortOrder::Asc);
        assert_eq!(notes[0].title, "old");
    }

    #[test]
    fn test_sort_alphabetical_ignores_case() {
        let mut notes = vec![dated("banana", 0), dated("Apple", 1), dated("cherry", 2)];
        sort_notes(&mut notes, SortBy::Alphabetical, SortOrder::Desc);
        let titles: Vec<_> = notes.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["Apple", "banana", "cherry"]);
    }

    #[test]
    fn test_sort_favorites_first() {
        let mut fav = dated("fav", 9);
        fav.favorite = true;
        let mut notes = vec![dated("recent", 0), fav, dated("older", 3)];
        sort_notes(&mut notes, SortBy::Favorites, SortOrder::Desc);
        let titles: Vec<_> = notes.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["fav", "recent", "older"]);
    }

    #[test]
    fn test_choices_parse_and_reject() {
        assert_eq!("Alphabetical".parse::<SortBy>().unwrap(), SortBy::Alphabetical);
        assert_eq!("asc".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert_eq!("folders".parse::<Grouping>().unwrap(), Grouping::Folders);
        let err = "size".parse::<SortBy>().unwrap_err();
        assert!(err.to_string().contains("alphabetical"));
    }

    #[test]
    fn test_group_by_date_buckets() {
        let now = Utc::now();
        let notes = vec![dated("today", 0), dated("days", 3), dated("ancient", 90)];
        let groups = group_by_date(&notes, now);
        let labels: Vec<_> = groups.iter().map(|(label, _)| label.as_str()).collect();
        assert_eq!(labels, vec!["Today", "This Week", "Older"]);
    }

    #[test]
    fn test_group_by_tags_sorted_with_untagged_last() {
        let notes = vec![
            Note::new("a", "x").with_tags(&["zeta", "alpha"]),
            Note::new("b", "x"),
            Note::new("c", "x").with_tags(&["alpha"]),
        ];
        let groups = group_by_tags(&notes);
        let labels: Vec<_> = groups.iter().map(|(label, _)| label.as_str()).collect();
        assert_eq!(labels, vec!["alpha", "zeta", UNTAGGED]);
        assert_eq!(groups[0].1.len(), 2);
    }

    #[test]
    fn test_group_by_folders_root_first() {
        let mut work = Note::new("w", "x");
        work.set_folder(Some("work"));
        let mut archive = Note::new("a", "x");
        archive.set_folder(Some("archive"));
        let groups = group_by_folders(&[work, Note::new("r", "x"), archive]);
        let labels: Vec<_> = groups.iter().map(|(label, _)| label.as_str()).collect();
        assert_eq!(labels, vec!["", "archive", "work"]);
    }

    #[test]
    fn test_folder_path_helpers() {
        assert_eq!(folder_display_name("work/reports/q3"), "q3");
        assert_eq!(folder_display_name(""), "Root");
        assert_eq!(parent_folder("work/reports/q3"), Some("work/reports"));
        assert_eq!(parent_folder("work"), None);
        assert_eq!(parent_folder(""), None);
    }
}
