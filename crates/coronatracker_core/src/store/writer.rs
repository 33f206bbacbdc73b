//! Background write execution.
//!
//! # Responsibility
//! - Own the read/write SQLite connection on one dedicated thread.
//! - Apply queued mutations strictly in submission order.
//! - Republish table snapshots after each committed mutation.
//!
//! # Invariants
//! - A command's reply is sent only after its snapshot has been published.
//! - A committed mutation always reports `Ok`; a failure to re-read the table
//!   afterwards is logged and leaves the views on the previous snapshot.
//! - The thread exits once every command sender is dropped and the queue
//!   has drained.

use super::country_store::{StoreError, StoreResult};
use super::feed::ChangeFeed;
use crate::model::country::Country;
use crate::repo::country_repo::{CountryRepository, SqliteCountryRepository};
use log::{debug, error, info};
use rusqlite::Connection;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread::JoinHandle;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};

const WRITER_THREAD_NAME: &str = "coronatracker-db-writer";

#[derive(Debug, Clone)]
pub(crate) enum WriteOp {
    Insert(Country),
    Update(Country),
    Delete(Country),
    Refresh,
}

impl WriteOp {
    fn name(&self) -> &'static str {
        match self {
            Self::Insert(_) => "insert",
            Self::Update(_) => "update",
            Self::Delete(_) => "delete",
            Self::Refresh => "refresh",
        }
    }

    fn code(&self) -> &str {
        match self {
            Self::Insert(country) | Self::Update(country) | Self::Delete(country) => {
                country.code.as_str()
            }
            Self::Refresh => "-",
        }
    }
}

struct WriteCommand {
    op: WriteOp,
    reply: oneshot::Sender<StoreResult<()>>,
}

/// Completion signal for one queued write.
///
/// Await it, call [`PendingWrite::wait`] from synchronous code, or drop it to
/// leave the write fire-and-forget. Dropping never cancels the write.
#[derive(Debug)]
#[must_use = "dropping a PendingWrite discards the write outcome"]
pub struct PendingWrite {
    rx: oneshot::Receiver<StoreResult<()>>,
}

impl PendingWrite {
    fn resolved(result: StoreResult<()>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self { rx }
    }

    /// Blocks the current thread until the writer reports the outcome.
    ///
    /// # Panics
    /// - When called from within an asynchronous execution context; await the
    ///   `PendingWrite` there instead.
    pub fn wait(self) -> StoreResult<()> {
        self.rx
            .blocking_recv()
            .unwrap_or(Err(StoreError::WriterClosed))
    }
}

impl Future for PendingWrite {
    type Output = StoreResult<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(StoreError::WriterClosed)))
    }
}

/// Handle to the single background writer thread.
pub(crate) struct Writer {
    tx: Option<mpsc::UnboundedSender<WriteCommand>>,
    thread: Option<JoinHandle<()>>,
}

impl Writer {
    pub(crate) fn spawn(conn: Connection, feed: Arc<ChangeFeed>) -> StoreResult<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let thread = std::thread::Builder::new()
            .name(WRITER_THREAD_NAME.to_string())
            .spawn(move || run(conn, feed, rx))
            .map_err(StoreError::Spawn)?;

        Ok(Self {
            tx: Some(tx),
            thread: Some(thread),
        })
    }

    pub(crate) fn submit(&self, op: WriteOp) -> PendingWrite {
        let Some(tx) = self.tx.as_ref() else {
            return PendingWrite::resolved(Err(StoreError::WriterClosed));
        };

        let (reply, rx) = oneshot::channel();
        debug!(
            "event=country_write module=store status=queued op={} code={}",
            op.name(),
            op.code()
        );
        if tx.send(WriteCommand { op, reply }).is_err() {
            return PendingWrite::resolved(Err(StoreError::WriterClosed));
        }
        PendingWrite { rx }
    }

    pub(crate) fn rejected(err: StoreError) -> PendingWrite {
        PendingWrite::resolved(Err(err))
    }
}

impl Drop for Writer {
    fn drop(&mut self) {
        drop(self.tx.take());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("event=writer_stop module=store status=error error_code=writer_panicked");
            }
        }
    }
}

fn run(conn: Connection, feed: Arc<ChangeFeed>, mut rx: mpsc::UnboundedReceiver<WriteCommand>) {
    info!("event=writer_start module=store status=ok");

    while let Some(WriteCommand { op, reply }) = rx.blocking_recv() {
        let started_at = Instant::now();
        let result = execute(&conn, &feed, &op);
        match &result {
            Ok(()) => info!(
                "event=country_write module=store status=ok op={} code={} duration_ms={}",
                op.name(),
                op.code(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=country_write module=store status=error op={} code={} duration_ms={} error={}",
                op.name(),
                op.code(),
                started_at.elapsed().as_millis(),
                err
            ),
        }

        if reply.send(result).is_err() {
            debug!(
                "event=country_write module=store status=unobserved op={} code={}",
                op.name(),
                op.code()
            );
        }
    }

    info!("event=writer_stop module=store status=ok reason=queue_closed");
}

fn execute(conn: &Connection, feed: &ChangeFeed, op: &WriteOp) -> StoreResult<()> {
    let repo = SqliteCountryRepository::try_new(conn)?;
    match op {
        WriteOp::Insert(country) => repo.insert_country(country)?,
        WriteOp::Update(country) => repo.update_country(country)?,
        WriteOp::Delete(country) => repo.delete_country(country)?,
        WriteOp::Refresh => {
            feed.publish(repo.list_countries()?);
            return Ok(());
        }
    }

    match repo.list_countries() {
        Ok(snapshot) => feed.publish(snapshot),
        Err(err) => error!(
            "event=feed_publish module=store status=error op={} code={} error={}",
            op.name(),
            op.code(),
            err
        ),
    }
    Ok(())
}
