// FILE: src/engine/dex.rs
//! The dex: an in-memory summary of every node in a keg.

use std::cmp::Reverse;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::collab::Chooser;
use crate::error::{KegError, Result};
use crate::storage::NodeId;

/// Timestamp layout used in every dex artifact.
pub const ISO_DATE_FMT: &str = "%Y-%m-%d %H:%M:%SZ";

/// Summary of one node: ID, title and last update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DexEntry {
    #[serde(rename = "N")]
    pub n: NodeId,
    #[serde(rename = "T")]
    pub t: String,
    #[serde(rename = "U")]
    pub u: DateTime<Utc>,
}

impl DexEntry {
    pub fn new(n: NodeId, t: impl Into<String>, u: DateTime<Utc>) -> Self {
        Self { n, t: t.into(), u }
    }

    pub fn id(&self) -> String {
        self.n.to_string()
    }

    pub fn updated(&self) -> String {
        self.u.format(ISO_DATE_FMT).to_string()
    }

    /// Table row, without the line terminator.
    pub fn tsv(&self) -> String {
        format!("{}\t{}\t{}", self.n, self.updated(), self.t)
    }

    /// Markdown include reference to the node.
    pub fn as_include(&self) -> String {
        format!("* [{}](../{})", self.t, self.n)
    }

    /// Changes row: include reference prefixed with the update time.
    pub fn md(&self) -> String {
        format!("* {} [{}](../{})", self.updated(), self.t, self.n)
    }
}

impl fmt::Display for DexEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.n, self.t)
    }
}

pub fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, ISO_DATE_FMT)
        .ok()
        .map(|t| t.and_utc())
}

/// Parses a table row (`N\tU\tT`). The title may itself contain tabs.
pub fn parse_tsv_row(line: &str) -> Option<DexEntry> {
    let mut fields = line.splitn(3, '\t');
    let n = fields.next()?.parse().ok()?;
    let u = parse_time(fields.next()?)?;
    let t = fields.next()?;
    Some(DexEntry::new(n, t, u))
}

/// Parses a changes row (`* U [T](../N)`). The title is taken greedily so
/// that brackets inside it survive.
pub fn parse_md_row(line: &str) -> Option<DexEntry> {
    let rest = line.strip_prefix("* ")?;
    let open = rest.find(" [")?;
    let u = parse_time(&rest[..open])?;
    let rest = rest[open + 2..].strip_suffix(')')?;
    let close = rest.rfind("](../")?;
    let n = rest[close + 5..].parse().ok()?;
    Some(DexEntry::new(n, &rest[..close], u))
}

/// Ordered collection of dex entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dex {
    entries: Vec<DexEntry>,
}

impl Dex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DexEntry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[DexEntry] {
        &self.entries
    }

    pub fn push(&mut self, entry: DexEntry) {
        self.entries.push(entry);
    }

    pub fn lookup(&self, id: NodeId) -> Result<&DexEntry> {
        self.entries
            .iter()
            .find(|e| e.n == id)
            .ok_or(KegError::NodeNotFound(id))
    }

    /// Replaces the entry with the same ID in place, or inserts it before the
    /// first entry with a larger ID.
    pub fn upsert(&mut self, entry: DexEntry) {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.n == entry.n) {
            *existing = entry;
            return;
        }
        let at = self
            .entries
            .iter()
            .position(|e| e.n > entry.n)
            .unwrap_or(self.entries.len());
        self.entries.insert(at, entry);
    }

    /// Drops the entry with `id`. Returns whether one was present.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.n != id);
        self.entries.len() != before
    }

    /// Ordered subsequence of entries whose title satisfies `matches`.
    pub fn filter<F>(&self, mut matches: F) -> Dex
    where
        F: FnMut(&str) -> bool,
    {
        Dex {
            entries: self.entries.iter().filter(|e| matches(&e.t)).cloned().collect(),
        }
    }

    pub fn with_title_text_exp(&self, re: &Regex) -> Dex {
        self.filter(|t| re.is_match(t))
    }

    /// Ascending by ID.
    pub fn sort_by_id(&mut self) {
        self.entries.sort_by_key(|e| e.n);
    }

    /// Most recent first; equal times by ID descending.
    pub fn sort_by_recency(&mut self) {
        self.entries.sort_by_key(|e| (Reverse(e.u), Reverse(e.n)));
    }

    pub fn by_id(mut self) -> Dex {
        self.sort_by_id();
        self
    }

    pub fn by_recency(mut self) -> Dex {
        self.sort_by_recency();
        self
    }

    /// The most recently created node, which is the one with the highest ID.
    pub fn last(&self) -> Option<&DexEntry> {
        self.entries.iter().max_by_key(|e| e.n)
    }

    /// The most recently updated node.
    pub fn last_changed(&self) -> Option<&DexEntry> {
        self.entries.iter().min_by_key(|e| (Reverse(e.u), Reverse(e.n)))
    }

    /// Uniform pick over all entries.
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&DexEntry> {
        if self.entries.is_empty() {
            return Err(KegError::NoCandidates);
        }
        Ok(&self.entries[rng.random_range(0..self.entries.len())])
    }

    /// Hands the entries, in order, to `chooser`. `Ok(None)` means the user
    /// chose nothing.
    pub fn choose(&self, chooser: &mut dyn Chooser) -> Result<Option<&DexEntry>> {
        if self.entries.is_empty() {
            return Err(KegError::NoCandidates);
        }
        let labels: Vec<String> = self.entries.iter().map(|e| e.to_string()).collect();
        match chooser.choose(&labels)? {
            None => Ok(None),
            Some(i) => self
                .entries
                .get(i)
                .map(Some)
                .ok_or_else(|| KegError::Collaborator(format!("choice {} out of range", i))),
        }
    }

    /// Table artifact text.
    pub fn to_tsv(&self) -> String {
        self.entries.iter().map(|e| e.tsv() + "\n").collect()
    }

    /// Changes artifact text.
    pub fn to_md(&self) -> String {
        self.entries.iter().map(|e| e.md() + "\n").collect()
    }

    pub fn as_includes(&self) -> String {
        self.entries.iter().map(|e| e.as_include() + "\n").collect()
    }

    /// Aligned, width-limited listing for humans.
    pub fn pretty(&self, columns: usize) -> String {
        let width = self.entries.iter().map(|e| e.id().len()).max().unwrap_or(1);
        let mut out = String::new();
        for e in &self.entries {
            let line = format!("{:>width$} {} {}", e.n, e.u.format("%Y-%m-%d"), e.t, width = width);
            out.extend(line.chars().take(columns.max(1)));
            out.push('\n');
        }
        out
    }
}

impl FromIterator<DexEntry> for Dex {
    fn from_iter<I: IntoIterator<Item = DexEntry>>(iter: I) -> Self {
        Dex { entries: iter.into_iter().collect() }
    }
}

impl IntoIterator for Dex {
    type Item = DexEntry;
    type IntoIter = std::vec::IntoIter<DexEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Dex {
    type Item = &'a DexEntry;
    type IntoIter = std::slice::Iter<'a, DexEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
