//! Breadcrumbs from the document root to the value being transformed.
//!
//! While walking, the path is a chain of stack-borrowed frames so extending it
//! costs nothing; it is only flattened into a [`JsonPath`] when an error needs
//! to carry it. Rendering follows `serde_path_to_error`: `flights[0].flt.flightNo`,
//! with `.` standing for the root.
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

#[derive(Debug, Clone, Copy)]
pub enum Crumb<'a> {
    Root,
    Key(&'a Crumb<'a>, &'a str),
    Index(&'a Crumb<'a>, usize),
}

impl<'a> Crumb<'a> {
    pub fn key(&'a self, key: &'a str) -> Crumb<'a> { Crumb::Key(self, key) }
    pub fn index(&'a self, i: usize) -> Crumb<'a> { Crumb::Index(self, i) }

    pub fn to_path(&self) -> JsonPath {
        let mut segments = Vec::new();
        let mut cur = self;
        loop {
            match cur {
                Crumb::Root => break,
                Crumb::Key(parent, k) => {
                    segments.push(Segment::Key((*k).to_owned()));
                    cur = parent;
                }
                Crumb::Index(parent, i) => {
                    segments.push(Segment::Index(*i));
                    cur = parent;
                }
            }
        }
        segments.reverse();
        JsonPath { segments }
    }
}

/// Owned path carried by validation errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonPath {
    pub segments: Vec<Segment>,
}

impl JsonPath {
    pub fn root() -> Self { Self::default() }

    pub fn is_root(&self) -> bool { self.segments.is_empty() }

    /// Last object key on the path, if any.
    pub fn last_key(&self) -> Option<&str> {
        self.segments.iter().rev().find_map(|s| match s {
            Segment::Key(k) => Some(k.as_str()),
            Segment::Index(_) => None,
        })
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Key(k) if k == key))
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str(".");
        }
        for (i, seg) in self.segments.iter().enumerate() {
            match seg {
                Segment::Key(k) if i == 0 => write!(f, "{k}")?,
                Segment::Key(k) => write!(f, ".{k}")?,
                Segment::Index(ix) => write!(f, "[{ix}]")?,
            }
        }
        Ok(())
    }
}
