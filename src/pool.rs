//! Bounded-concurrency job runner shared by enrichment and media download.
//!
//! A fixed set of workers pull indices from a cursor that lives only for the
//! duration of one [`run`] call. Every slot of the output corresponds to the
//! input at the same index, whatever order the jobs complete in.
use anyhow::Result;
use futures::future::join_all;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

pub const DEFAULT_CONCURRENCY: usize = 12;

/// Result of one job. `Skipped` keeps the reason instead of swallowing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<R> {
    Success(R),
    Skipped(String),
}

impl<R> Outcome<R> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn skip_reason(&self) -> Option<&str> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Skipped(reason) => Some(reason),
        }
    }
}

/// Run `op` over every item with at most `concurrency` jobs in flight.
///
/// A failing job never stops the others; its slot becomes `Skipped` with the
/// error chain as reason. A concurrency of 0 is treated as 1.
pub async fn run<'a, T, R, F, Fut>(items: &'a [T], concurrency: usize, op: F) -> Vec<Outcome<R>>
where
    F: Fn(usize, &'a T) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    if items.is_empty() {
        return Vec::new();
    }
    let workers = concurrency.max(1).min(items.len());
    let cursor = AtomicUsize::new(0);

    let finished = join_all((0..workers).map(|worker| {
        let cursor = &cursor;
        let op = &op;
        async move {
            let mut done = Vec::new();
            loop {
                let index = cursor.fetch_add(1, Ordering::Relaxed);
                let Some(item) = items.get(index) else {
                    break;
                };
                let outcome = match op(index, item).await {
                    Ok(value) => Outcome::Success(value),
                    Err(err) => Outcome::Skipped(format!("{err:#}")),
                };
                done.push((index, outcome));
            }
            debug!(worker, jobs = done.len(), "worker drained queue");
            done
        }
    }))
    .await;

    let mut slots: Vec<Option<Outcome<R>>> = std::iter::repeat_with(|| None).take(items.len()).collect();
    for (index, outcome) in finished.into_iter().flatten() {
        slots[index] = Some(outcome);
    }
    slots
        .into_iter()
        .map(|slot| slot.unwrap_or_else(|| Outcome::Skipped("job was never claimed".into())))
        .collect()
}

/// Like [`run`], but resolves skipped slots with `fallback(item, reason)`.
pub async fn run_with_fallback<'a, T, R, F, Fut, B>(
    items: &'a [T],
    concurrency: usize,
    op: F,
    fallback: B,
) -> Vec<R>
where
    F: Fn(usize, &'a T) -> Fut,
    Fut: Future<Output = Result<R>>,
    B: Fn(&'a T, &str) -> R,
{
    run(items, concurrency, op)
        .await
        .into_iter()
        .zip(items)
        .map(|(outcome, item)| match outcome {
            Outcome::Success(value) => value,
            Outcome::Skipped(reason) => fallback(item, &reason),
        })
        .collect()
}
