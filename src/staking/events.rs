use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use super::types::SlashingEvent;
use super::StakingRegistrySource;
use crate::error::{ReimburseError, Result};

/// How the lower bound moves after a full page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorMode {
    /// Next page starts at `last.date + 1`. Loses events that share the
    /// last timestamp of a full page.
    Timestamp,
    /// Next page starts after `(last.date, last.id)`.
    #[default]
    Keyset,
}

/// Inclusive date range `[start, end]`. With `after_id` set, events dated
/// exactly `start` must also have an id greater than `after_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventWindow {
    pub start: u64,
    pub end: u64,
    pub after_id: Option<String>,
}

impl EventWindow {
    pub fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end,
            after_id: None,
        }
    }

    pub fn contains(&self, event: &SlashingEvent) -> bool {
        if event.date < self.start || event.date > self.end {
            return false;
        }
        match &self.after_id {
            Some(after) if event.date == self.start => event.id.as_str() > after.as_str(),
            _ => true,
        }
    }
}

/// Walks the registry's slashing events one bounded page at a time.
pub struct EventPaginator<S: ?Sized> {
    source: Arc<S>,
    page_size: usize,
    mode: CursorMode,
}

impl<S: StakingRegistrySource + ?Sized> EventPaginator<S> {
    pub fn new(source: Arc<S>, page_size: usize, mode: CursorMode) -> Self {
        Self {
            source,
            page_size,
            mode,
        }
    }

    /// All events dated within `[start, end]` whose amount is at least
    /// `min_amount`, sorted by date then id.
    ///
    /// The minimum is applied after paging, so filtered events still count
    /// towards a full page. Nothing is kept between calls.
    pub async fn fetch_events(
        &self,
        start: u64,
        end: u64,
        min_amount: &BigUint,
    ) -> Result<Vec<SlashingEvent>> {
        if self.page_size == 0 {
            return Err(ReimburseError::Config("page size must be positive".into()));
        }

        let mut window = EventWindow::new(start, end);
        let mut fetched: Vec<SlashingEvent> = Vec::new();
        let mut pages = 0usize;

        while window.start <= end {
            let page = self.source.slashing_events_page(&window, self.page_size).await?;
            pages += 1;
            debug!(
                page = pages,
                start = window.start,
                after_id = ?window.after_id,
                returned = page.len(),
                "Fetched slashing events page"
            );

            let exhausted = page.len() < self.page_size;
            let cursor = page.last().map(|e| (e.date, e.id.clone()));
            fetched.extend(page);
            if exhausted {
                break;
            }
            let Some((last_date, last_id)) = cursor else {
                break;
            };

            let next = match self.mode {
                CursorMode::Timestamp => match last_date.checked_add(1) {
                    Some(start) => EventWindow::new(start, end),
                    None => break,
                },
                CursorMode::Keyset => EventWindow {
                    start: last_date,
                    end,
                    after_id: Some(last_id),
                },
            };
            if !advances(&window, &next) {
                return Err(ReimburseError::InvalidData(format!(
                    "slashing event page did not advance past {:?}",
                    window
                )));
            }
            window = next;
        }

        let total = fetched.len();
        let mut seen = HashSet::new();
        let mut events: Vec<SlashingEvent> = fetched
            .into_iter()
            .filter(|e| seen.insert(e.id.clone()))
            .filter(|e| &e.amount >= min_amount)
            .collect();
        events.sort_by(|a, b| (a.date, &a.id).cmp(&(b.date, &b.id)));

        info!(
            pages,
            fetched = total,
            kept = events.len(),
            min_amount = %min_amount,
            "Collected slashing events"
        );
        Ok(events)
    }
}

fn advances(current: &EventWindow, next: &EventWindow) -> bool {
    match (next.start.cmp(&current.start), &current.after_id, &next.after_id) {
        (std::cmp::Ordering::Greater, _, _) => true,
        (std::cmp::Ordering::Equal, None, Some(_)) => true,
        (std::cmp::Ordering::Equal, Some(a), Some(b)) => b > a,
        _ => false,
    }
}
