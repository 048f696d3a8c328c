//! Reading navigation over a canonical chapter list and a chapter's pages.

use crate::model::{CanonicalChapter, ChapterInfo};
use serde::Serialize;

/// A chapter and its neighbours in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChapterNeighbors<'a> {
    pub current: Option<&'a CanonicalChapter>,
    pub prev: Option<&'a CanonicalChapter>,
    pub next: Option<&'a CanonicalChapter>,
}

impl<'a> ChapterNeighbors<'a> {
    /// Locate `chapter_id` in `chapters`. An unknown id has no current chapter and no neighbours.
    pub fn locate(chapters: &'a [CanonicalChapter], chapter_id: &str) -> Self {
        match chapters.iter().position(|c| c.id == chapter_id) {
            Some(i) => ChapterNeighbors {
                current: chapters.get(i),
                prev: i.checked_sub(1).and_then(|p| chapters.get(p)),
                next: chapters.get(i + 1),
            },
            None => ChapterNeighbors {
                current: None,
                prev: None,
                next: None,
            },
        }
    }
}

/// Position within a chapter's pages for page-at-a-time reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    index: usize,
    len: usize,
}

impl PageCursor {
    pub fn new(len: usize) -> Self {
        Self { index: 0, len }
    }

    /// Cursor at `index`, clamped to the last page.
    pub fn at(len: usize, index: usize) -> Self {
        Self {
            index: index.min(len.saturating_sub(1)),
            len,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn next_page(&mut self) -> usize {
        self.index = (self.index + 1).min(self.len.saturating_sub(1));
        self.index
    }

    pub fn prev_page(&mut self) -> usize {
        self.index = self.index.saturating_sub(1);
        self.index
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.len
    }

    /// The page at the cursor, if any.
    pub fn current<'p>(&self, pages: &'p [String]) -> Option<&'p str> {
        pages.get(self.index).map(String::as_str)
    }
}

/// Everything shown for one reading position: the chapter, its neighbours, and the page
/// under the cursor. `page` is 1-based and 0 when the chapter has no pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingView {
    pub chapter: ChapterInfo,
    pub current: Option<CanonicalChapter>,
    pub prev: Option<CanonicalChapter>,
    pub next: Option<CanonicalChapter>,
    pub page: usize,
    pub page_count: usize,
    pub page_url: Option<String>,
}

impl ReadingView {
    pub fn new(
        chapter: ChapterInfo,
        neighbors: ChapterNeighbors<'_>,
        pages: &[String],
        cursor: PageCursor,
    ) -> Self {
        let page_url = cursor.current(pages).map(str::to_string);
        ReadingView {
            chapter,
            current: neighbors.current.cloned(),
            prev: neighbors.prev.cloned(),
            next: neighbors.next.cloned(),
            page: if page_url.is_some() { cursor.index() + 1 } else { 0 },
            page_count: pages.len(),
            page_url,
        }
    }
}
