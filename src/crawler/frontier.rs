//! Link frontier shared by the workers of one job
//!
//! Dequeueing a link and marking it visited happen in the same critical
//! section, so two workers never receive the same link. Lock order is the
//! frontier queue first, then the link collector.

use crate::collector::LinkCollector;
use crate::output::write_snapshot;
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

/// What a worker should do after asking for work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next {
    /// Fetch this link; it is already marked visited
    Link(String),
    /// Nothing queued, but pages still in flight may discover more links
    Wait,
    /// Nothing queued and nothing in flight
    Exhausted,
}

#[derive(Debug, Default)]
struct Queue {
    unvisited: VecDeque<String>,
    queued: HashSet<String>,
    in_flight: usize,
}

/// Keeps a dequeued page counted as in flight until dropped
///
/// Dropping the guard also runs when the page handler panics or its future
/// is cancelled, so an abandoned page never leaves other workers waiting.
#[must_use = "the page stops counting as in flight as soon as the guard is dropped"]
pub struct PageGuard<'a> {
    frontier: &'a Frontier,
}

impl Drop for PageGuard<'_> {
    fn drop(&mut self) {
        self.frontier.finish_page();
    }
}

/// FIFO of discovered links backed by the link collector's visited set
#[derive(Debug)]
pub struct Frontier {
    queue: Mutex<Queue>,
    links: Arc<LinkCollector>,
}

impl Frontier {
    pub fn new(links: Arc<LinkCollector>) -> Self {
        Self {
            queue: Mutex::new(Queue::default()),
            links,
        }
    }

    /// The link collector holding the visited set
    pub fn links(&self) -> &Arc<LinkCollector> {
        &self.links
    }

    /// Pops the next unvisited link and marks it visited
    ///
    /// A returned link counts as in flight until the [`PageGuard`] obtained
    /// from [`Frontier::page_guard`] for it is dropped.
    pub fn next_link(&self) -> Next {
        let mut queue = self.lock_queue();

        while let Some(link) = queue.unvisited.pop_front() {
            queue.queued.remove(&link);
            if self.links.add_visited(&link) {
                queue.in_flight += 1;
                return Next::Link(link);
            }
        }

        if queue.in_flight > 0 {
            Next::Wait
        } else {
            Next::Exhausted
        }
    }

    /// Guards a page returned by [`Frontier::next_link`]
    ///
    /// Drop the guard after the page's links were offered, so that waiting
    /// workers do not see an exhausted frontier before those links are queued.
    pub fn page_guard(&self) -> PageGuard<'_> {
        PageGuard { frontier: self }
    }

    fn finish_page(&self) {
        let mut queue = self.lock_queue();
        queue.in_flight = queue.in_flight.saturating_sub(1);
    }

    /// Queues discovered links that were neither visited nor already queued
    ///
    /// # Returns
    ///
    /// The number of links added to the queue
    pub fn offer<I>(&self, links: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let mut queue = self.lock_queue();
        let mut added = 0;

        for link in links {
            if queue.queued.contains(&link) || self.links.already_visited(&link) {
                continue;
            }
            queue.queued.insert(link.clone());
            queue.unvisited.push_back(link);
            added += 1;
        }

        added
    }

    /// Number of queued links
    pub fn len(&self) -> usize {
        self.lock_queue().unvisited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of pages currently being processed
    pub fn in_flight(&self) -> usize {
        self.lock_queue().in_flight
    }

    /// Copy of the queued links in dequeue order
    pub fn snapshot(&self) -> Vec<String> {
        self.lock_queue().unvisited.iter().cloned().collect()
    }

    /// Writes the queued links to `path`, replacing the previous snapshot
    pub fn save_unvisited(&self, path: &Path) -> std::io::Result<usize> {
        let snapshot = self.snapshot();
        write_snapshot(path, &snapshot)?;
        Ok(snapshot.len())
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::LinkFilters;
    use crate::parser::StandardParser;
    use tempfile::TempDir;

    fn frontier(dir: &Path) -> Frontier {
        let links = LinkCollector::new(
            StandardParser::Links.descriptor(),
            LinkFilters::default(),
            dir.join("job.visited.txt"),
        );
        Frontier::new(Arc::new(links))
    }

    fn owned(links: &[&str]) -> Vec<String> {
        links.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_fifo_order() {
        let dir = TempDir::new().unwrap();
        let frontier = frontier(dir.path());

        assert_eq!(frontier.offer(owned(&["a", "b", "c"])), 3);
        assert_eq!(frontier.next_link(), Next::Link("a".to_string()));
        assert_eq!(frontier.next_link(), Next::Link("b".to_string()));
        assert_eq!(frontier.len(), 1);
    }

    #[test]
    fn test_offer_rejects_queued_and_visited() {
        let dir = TempDir::new().unwrap();
        let frontier = frontier(dir.path());

        frontier.offer(owned(&["a", "b"]));
        assert_eq!(frontier.offer(owned(&["a", "b", "c"])), 1);

        assert_eq!(frontier.next_link(), Next::Link("a".to_string()));
        frontier.finish_page();
        assert_eq!(frontier.offer(owned(&["a"])), 0);
        assert!(frontier.links().already_visited("a"));
    }

    #[test]
    fn test_wait_while_pages_in_flight() {
        let dir = TempDir::new().unwrap();
        let frontier = frontier(dir.path());

        frontier.offer(owned(&["a"]));
        assert_eq!(frontier.next_link(), Next::Link("a".to_string()));
        assert_eq!(frontier.next_link(), Next::Wait);

        frontier.offer(owned(&["b"]));
        frontier.finish_page();
        assert_eq!(frontier.next_link(), Next::Link("b".to_string()));
        frontier.finish_page();
        assert_eq!(frontier.next_link(), Next::Exhausted);
        assert_eq!(frontier.in_flight(), 0);
    }

    #[test]
    fn test_page_guard_releases_on_panic() {
        let dir = TempDir::new().unwrap();
        let frontier = frontier(dir.path());
        frontier.offer(owned(&["a"]));

        assert_eq!(frontier.next_link(), Next::Link("a".to_string()));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _page = frontier.page_guard();
            assert_eq!(frontier.in_flight(), 1);
            panic!("page handler failed");
        }));

        assert!(result.is_err());
        assert_eq!(frontier.in_flight(), 0);
        assert_eq!(frontier.next_link(), Next::Exhausted);
    }

    #[test]
    fn test_save_unvisited_snapshot() {
        let dir = TempDir::new().unwrap();
        let frontier = frontier(dir.path());
        let path = dir.path().join("job.unvisited.txt");

        frontier.offer(owned(&["a", "b"]));
        assert_eq!(frontier.save_unvisited(&path).unwrap(), 2);
        frontier.next_link();
        frontier.save_unvisited(&path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "b\n");
    }

    #[test]
    fn test_concurrent_dequeue_never_duplicates() {
        let dir = TempDir::new().unwrap();
        let frontier = Arc::new(frontier(dir.path()));
        frontier.offer((0..500).map(|i| format!("https://example.com/{}", i)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let frontier = Arc::clone(&frontier);
                std::thread::spawn(move || {
                    let mut taken = Vec::new();
                    while let Next::Link(link) = frontier.next_link() {
                        // Rediscovering known links must not requeue them
                        frontier.offer(vec![link.clone()]);
                        frontier.finish_page();
                        taken.push(link);
                    }
                    taken
                })
            })
            .collect();

        let mut all: Vec<String> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let total = all.len();
        all.sort();
        all.dedup();

        assert_eq!(total, 500);
        assert_eq!(all.len(), 500);
    }
}
