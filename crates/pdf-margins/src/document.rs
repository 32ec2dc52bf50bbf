//! Per-document annotation state
//!
//! [`AnnotatedDocument`] holds each page's margin configuration and ink,
//! keyed by page index, and tells subscribers about every change through
//! their own channel.

use std::collections::BTreeMap;

use log::debug;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::ink::{PageInk, StrokeCollection};
use crate::options::MarginConfig;
use crate::types::{MarginError, Result};

/// What changed on a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    MarginSettings,
    Ink,
    PageInserted,
    PageRemoved,
    /// The page now at `page_index` was moved there from `from`
    PageMoved { from: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentEvent {
    pub page_index: usize,
    pub kind: ChangeKind,
}

/// Owned copy of a document's annotation state, for export threads
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentSnapshot {
    page_count: usize,
    configs: BTreeMap<usize, MarginConfig>,
    ink: BTreeMap<usize, PageInk>,
}

impl DocumentSnapshot {
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Margin settings for a page; defaults when none were applied
    pub fn margin_config(&self, page_index: usize) -> MarginConfig {
        self.configs.get(&page_index).copied().unwrap_or_default()
    }

    /// Ink for a page; empty when none was drawn
    pub fn ink(&self, page_index: usize) -> PageInk {
        self.ink.get(&page_index).cloned().unwrap_or_default()
    }

    pub(crate) fn ink_ref(&self, page_index: usize) -> Option<&PageInk> {
        self.ink.get(&page_index)
    }
}

/// Annotation state of one open document
#[derive(Debug, Default)]
pub struct AnnotatedDocument {
    state: DocumentSnapshot,
    subscribers: Vec<UnboundedSender<DocumentEvent>>,
}

impl AnnotatedDocument {
    pub fn new(page_count: usize) -> Self {
        Self {
            state: DocumentSnapshot {
                page_count,
                ..Default::default()
            },
            subscribers: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.state.page_count
    }

    /// Register a listener. The returned receiver sees every later change.
    pub fn subscribe(&mut self) -> UnboundedReceiver<DocumentEvent> {
        let (tx, rx) = unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        self.state.clone()
    }

    pub fn margin_config(&self, page_index: usize) -> MarginConfig {
        self.state.margin_config(page_index)
    }

    pub fn ink(&self, page_index: usize) -> PageInk {
        self.state.ink(page_index)
    }

    /// Store margin settings for a page.
    ///
    /// The value is clamped to its bounds first. With
    /// `applied_to_all_pages` set, every page receives its own copy.
    /// Margin ink is left where it is in canvas space.
    pub fn apply_margin_settings(&mut self, page_index: usize, config: MarginConfig) -> Result<()> {
        self.check(page_index)?;
        let config = config.clamped();

        let targets: Vec<usize> = if config.applied_to_all_pages {
            (0..self.state.page_count).collect()
        } else {
            vec![page_index]
        };

        for index in targets {
            if self.state.configs.get(&index) == Some(&config) {
                continue;
            }
            self.state.configs.insert(index, config);
            self.emit(index, ChangeKind::MarginSettings);
        }
        Ok(())
    }

    /// Replace the document-anchored ink of a page (normalized coordinates)
    pub fn set_document_ink(&mut self, page_index: usize, strokes: StrokeCollection) -> Result<()> {
        self.check(page_index)?;
        self.state.ink.entry(page_index).or_default().document = strokes;
        self.emit(page_index, ChangeKind::Ink);
        Ok(())
    }

    /// Replace the margin ink of a page (canvas coordinates)
    pub fn set_margin_ink(&mut self, page_index: usize, strokes: StrokeCollection) -> Result<()> {
        self.check(page_index)?;
        self.state.ink.entry(page_index).or_default().margin = strokes;
        self.emit(page_index, ChangeKind::Ink);
        Ok(())
    }

    pub fn set_ink(&mut self, page_index: usize, ink: PageInk) -> Result<()> {
        self.check(page_index)?;
        self.state.ink.insert(page_index, ink);
        self.emit(page_index, ChangeKind::Ink);
        Ok(())
    }

    /// Insert a blank page at `at`; later pages shift up by one
    pub fn insert_page(&mut self, at: usize) -> Result<()> {
        if at > self.state.page_count {
            return Err(MarginError::PageOutOfRange {
                page: at,
                count: self.state.page_count,
            });
        }
        shift_keys(&mut self.state.configs, |i| if i >= at { i + 1 } else { i });
        shift_keys(&mut self.state.ink, |i| if i >= at { i + 1 } else { i });
        self.state.page_count += 1;
        self.emit(at, ChangeKind::PageInserted);
        Ok(())
    }

    /// Remove page `at` with its settings and ink; later pages shift down
    pub fn remove_page(&mut self, at: usize) -> Result<()> {
        self.check(at)?;
        self.state.configs.remove(&at);
        self.state.ink.remove(&at);
        shift_keys(&mut self.state.configs, |i| if i > at { i - 1 } else { i });
        shift_keys(&mut self.state.ink, |i| if i > at { i - 1 } else { i });
        self.state.page_count -= 1;
        self.emit(at, ChangeKind::PageRemoved);
        Ok(())
    }

    /// Move page `from` to position `to`, carrying its settings and ink
    pub fn move_page(&mut self, from: usize, to: usize) -> Result<()> {
        self.check(from)?;
        self.check(to)?;
        if from == to {
            return Ok(());
        }

        let remap = |i: usize| {
            if i == from {
                to
            } else if from < to && i > from && i <= to {
                i - 1
            } else if to < from && i >= to && i < from {
                i + 1
            } else {
                i
            }
        };
        shift_keys(&mut self.state.configs, remap);
        shift_keys(&mut self.state.ink, remap);
        self.emit(to, ChangeKind::PageMoved { from });
        Ok(())
    }

    fn check(&self, page_index: usize) -> Result<()> {
        if page_index < self.state.page_count {
            Ok(())
        } else {
            Err(MarginError::PageOutOfRange {
                page: page_index,
                count: self.state.page_count,
            })
        }
    }

    fn emit(&mut self, page_index: usize, kind: ChangeKind) {
        let event = DocumentEvent { page_index, kind };
        let before = self.subscribers.len();
        self.subscribers.retain(|tx| tx.send(event).is_ok());
        if self.subscribers.len() != before {
            debug!(
                "Dropped {} closed document subscriber(s)",
                before - self.subscribers.len()
            );
        }
    }
}

fn shift_keys<V>(map: &mut BTreeMap<usize, V>, remap: impl Fn(usize) -> usize) {
    *map = std::mem::take(map)
        .into_iter()
        .map(|(k, v)| (remap(k), v))
        .collect();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ink::InkStroke;
    use crate::types::{Anchor, Rgba};
    use kurbo::Point;

    fn dot(x: f64) -> StrokeCollection {
        vec![InkStroke::new(vec![Point::new(x, x)], 1.0, Rgba::BLACK)].into()
    }

    fn drain(rx: &mut UnboundedReceiver<DocumentEvent>) -> Vec<DocumentEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_missing_page_returns_defaults() {
        let doc = AnnotatedDocument::new(2);
        assert_eq!(doc.margin_config(1), MarginConfig::default());
        assert!(doc.ink(1).is_empty());
    }

    #[test]
    fn test_apply_to_all_copies_values() {
        let mut doc = AnnotatedDocument::new(3);
        let mut rx = doc.subscribe();

        let mut config = MarginConfig::new(Anchor::TopLeft, 0.5);
        config.applied_to_all_pages = true;
        doc.apply_margin_settings(1, config).unwrap();

        assert_eq!(drain(&mut rx).len(), 3);
        for i in 0..3 {
            assert_eq!(doc.margin_config(i).scale(), 0.5);
        }

        // Changing one page afterwards leaves the others alone
        doc.apply_margin_settings(0, MarginConfig::new(Anchor::Center, 0.8))
            .unwrap();
        assert_eq!(doc.margin_config(0).scale(), 0.8);
        assert_eq!(doc.margin_config(2).scale(), 0.5);
    }

    #[test]
    fn test_settings_are_clamped() {
        let mut doc = AnnotatedDocument::new(1);
        let config = MarginConfig::new(Anchor::Center, 0.5)
            .with_bounds(crate::options::ScaleBounds::new(0.6, 0.9));
        doc.apply_margin_settings(0, config).unwrap();
        assert_eq!(doc.margin_config(0).scale(), 0.6);
    }

    #[test]
    fn test_remove_page_reindexes() {
        let mut doc = AnnotatedDocument::new(3);
        doc.set_margin_ink(0, dot(0.0)).unwrap();
        doc.set_margin_ink(1, dot(1.0)).unwrap();
        doc.set_margin_ink(2, dot(2.0)).unwrap();

        doc.remove_page(1).unwrap();
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.ink(1).margin, dot(2.0));
        assert!(doc.set_margin_ink(2, dot(0.0)).is_err());
    }

    #[test]
    fn test_insert_page_shifts_following_pages() {
        let mut doc = AnnotatedDocument::new(2);
        doc.set_document_ink(1, dot(1.0)).unwrap();
        doc.insert_page(0).unwrap();

        assert_eq!(doc.page_count(), 3);
        assert!(doc.ink(0).is_empty());
        assert_eq!(doc.ink(2).document, dot(1.0));
    }

    #[test]
    fn test_move_page_carries_state() {
        let mut doc = AnnotatedDocument::new(4);
        for i in 0..4 {
            doc.set_margin_ink(i, dot(i as f64)).unwrap();
        }
        let mut rx = doc.subscribe();

        doc.move_page(0, 2).unwrap();
        let order: Vec<_> = (0..4).map(|i| doc.ink(i).margin).collect();
        assert_eq!(order, vec![dot(1.0), dot(2.0), dot(0.0), dot(3.0)]);

        doc.move_page(3, 0).unwrap();
        let order: Vec<_> = (0..4).map(|i| doc.ink(i).margin).collect();
        assert_eq!(order, vec![dot(3.0), dot(1.0), dot(2.0), dot(0.0)]);

        let events = drain(&mut rx);
        assert_eq!(
            events[0],
            DocumentEvent {
                page_index: 2,
                kind: ChangeKind::PageMoved { from: 0 }
            }
        );
    }

    #[test]
    fn test_closed_subscribers_are_pruned() {
        let mut doc = AnnotatedDocument::new(1);
        let rx = doc.subscribe();
        let mut live = doc.subscribe();
        drop(rx);

        doc.set_margin_ink(0, dot(0.0)).unwrap();
        assert_eq!(doc.subscribers.len(), 1);
        assert_eq!(drain(&mut live).len(), 1);
    }
}
