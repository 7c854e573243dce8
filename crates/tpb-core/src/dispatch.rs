//! One polling cycle: read cursor, poll, answer, advance cursor.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    errors::Error,
    formatting::ResponseFormatter,
    offset::OffsetStore,
    ports::{MessagingPort, UpdateSource},
    updates, Result,
};

/// Counters for one batch, logged by the binary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub received: usize,
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Offset written at the end of the batch, if any.
    pub new_offset: Option<i64>,
}

pub struct DispatchLoop {
    source: Arc<dyn UpdateSource>,
    messenger: Arc<dyn MessagingPort>,
    offsets: Arc<dyn OffsetStore>,
    formatter: ResponseFormatter,
}

impl DispatchLoop {
    pub fn new(
        source: Arc<dyn UpdateSource>,
        messenger: Arc<dyn MessagingPort>,
        offsets: Arc<dyn OffsetStore>,
        formatter: ResponseFormatter,
    ) -> Self {
        Self {
            source,
            messenger,
            offsets,
            formatter,
        }
    }

    /// Run a single batch.
    ///
    /// A poll failure returns early with no sends and no offset write. Send
    /// failures are logged and counted; they never stop the batch.
    pub async fn run_once(&self) -> Result<BatchReport> {
        let offset = self.offsets.read()?;
        let batch = updates::poll(self.source.as_ref(), offset).await?;

        let mut report = BatchReport {
            received: batch.len(),
            ..BatchReport::default()
        };

        for update in &batch {
            let Some((chat_id, text)) = update.reply_target() else {
                debug!(update_id = update.update_id, "skipping update without text");
                report.skipped += 1;
                continue;
            };

            let reply = self.formatter.format(text).await;
            let parse_mode = self.formatter.parse_mode();
            match self.messenger.send_text(chat_id, &reply, parse_mode).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    warn!(update_id = update.update_id, chat_id = chat_id.0, error = %e, "send failed");
                    report.failed += 1;
                }
            }
        }

        // The cursor follows batch position, answered or not.
        if let Some(last) = batch.last() {
            let next = last.update_id.checked_add(1).ok_or_else(|| {
                Error::Upstream(format!(
                    "update_id {} leaves no room for the next offset",
                    last.update_id
                ))
            })?;
            self.offsets.write(next)?;
            report.new_offset = Some(next);
        }

        info!(
            offset,
            received = report.received,
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            new_offset = ?report.new_offset,
            "batch done"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ChatId, ParseMode, Update},
        offset::MemoryOffsetStore,
        registry::tests::{packages, FakeRegistry},
        registry::SearchResponse,
        updates::PollResponse,
    };
    use async_trait::async_trait;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    struct FakeSource {
        response: Mutex<Option<Result<PollResponse>>>,
        offsets_seen: Mutex<Vec<i64>>,
    }

    impl FakeSource {
        fn new(response: Result<PollResponse>) -> Self {
            Self {
                response: Mutex::new(Some(response)),
                offsets_seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl UpdateSource for FakeSource {
        async fn fetch_updates(&self, offset: i64) -> Result<PollResponse> {
            self.offsets_seen.lock().unwrap().push(offset);
            self.response
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Ok(PollResponse::default()))
        }
    }

    #[derive(Default)]
    struct FakeMessenger {
        sends: Mutex<Vec<(ChatId, String, ParseMode)>>,
        fail_chats: Vec<i64>,
        attempts: AtomicUsize,
    }

    impl FakeMessenger {
        fn failing_for(chats: &[i64]) -> Self {
            Self {
                fail_chats: chats.to_vec(),
                ..Self::default()
            }
        }

        fn sent(&self) -> Vec<(ChatId, String, ParseMode)> {
            self.sends.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessagingPort for FakeMessenger {
        async fn send_text(&self, chat_id: ChatId, text: &str, parse_mode: ParseMode) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail_chats.contains(&chat_id.0) {
                return Err(Error::Upstream("Bad Request: chat not found".to_string()));
            }
            self.sends
                .lock()
                .unwrap()
                .push((chat_id, text.to_string(), parse_mode));
            Ok(())
        }
    }

    fn text_update(id: i64, chat: i64, text: &str) -> Update {
        Update {
            update_id: id,
            chat_id: Some(ChatId(chat)),
            text: Some(text.to_string()),
        }
    }

    fn bare_update(id: i64, chat: i64) -> Update {
        Update {
            update_id: id,
            chat_id: Some(ChatId(chat)),
            text: None,
        }
    }

    struct Harness {
        source: Arc<FakeSource>,
        messenger: Arc<FakeMessenger>,
        offsets: Arc<MemoryOffsetStore>,
        registry: Arc<FakeRegistry>,
        dispatch: DispatchLoop,
    }

    fn harness(
        response: Result<PollResponse>,
        messenger: FakeMessenger,
        offsets: MemoryOffsetStore,
    ) -> Harness {
        let source = Arc::new(FakeSource::new(response));
        let messenger = Arc::new(messenger);
        let offsets = Arc::new(offsets);
        let registry = Arc::new(FakeRegistry::returning(SearchResponse {
            total: Some(2),
            results: packages(2),
        }));
        let formatter =
            ResponseFormatter::new(registry.clone(), "/start", "Welcome!", ParseMode::Html);
        let dispatch = DispatchLoop::new(
            source.clone(),
            messenger.clone(),
            offsets.clone(),
            formatter,
        );
        Harness {
            source,
            messenger,
            offsets,
            registry,
            dispatch,
        }
    }

    #[tokio::test]
    async fn fatal_poll_sends_nothing_and_keeps_offset() {
        let h = harness(
            Ok(PollResponse {
                ok: false,
                updates: vec![],
                description: None,
            }),
            FakeMessenger::default(),
            MemoryOffsetStore::with_value(41),
        );

        let err = h.dispatch.run_once().await.unwrap_err();
        assert!(matches!(err, Error::FatalPoll(_)));
        assert!(h.messenger.sent().is_empty());
        assert_eq!(h.offsets.read().unwrap(), 41);
        assert_eq!(h.offsets.writes(), 0);
        assert_eq!(*h.source.offsets_seen.lock().unwrap(), vec![41]);
    }

    #[tokio::test]
    async fn transport_failure_aborts_batch() {
        let h = harness(
            Err(Error::Upstream("connection reset".to_string())),
            FakeMessenger::default(),
            MemoryOffsetStore::with_value(3),
        );

        assert!(h.dispatch.run_once().await.is_err());
        assert_eq!(h.messenger.attempts.load(Ordering::SeqCst), 0);
        assert_eq!(h.offsets.writes(), 0);
    }

    #[tokio::test]
    async fn textless_last_update_still_advances_cursor() {
        let h = harness(
            Ok(PollResponse {
                ok: true,
                updates: vec![text_update(5, 1, "abc"), bare_update(6, 2)],
                description: None,
            }),
            FakeMessenger::default(),
            MemoryOffsetStore::default(),
        );

        let report = h.dispatch.run_once().await.unwrap();

        let sent = h.messenger.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, ChatId(1));
        assert_eq!(sent[0].2, ParseMode::Html);
        assert!(sent[0].1.contains("vendor/pkg-0"));
        assert_eq!(h.offsets.read().unwrap(), 7);
        assert_eq!(h.offsets.writes(), 1);
        assert_eq!(
            report,
            BatchReport {
                received: 2,
                sent: 1,
                failed: 0,
                skipped: 1,
                new_offset: Some(7),
            }
        );
    }

    #[tokio::test]
    async fn empty_batch_leaves_offset_alone() {
        let h = harness(
            Ok(PollResponse {
                ok: true,
                updates: vec![],
                description: None,
            }),
            FakeMessenger::default(),
            MemoryOffsetStore::with_value(10),
        );

        let report = h.dispatch.run_once().await.unwrap();
        assert_eq!(report.new_offset, None);
        assert_eq!(h.offsets.writes(), 0);
        assert_eq!(h.offsets.read().unwrap(), 10);
    }

    #[tokio::test]
    async fn not_ok_with_updates_is_still_answered() {
        let h = harness(
            Ok(PollResponse {
                ok: false,
                updates: vec![text_update(20, 4, "/start")],
                description: None,
            }),
            FakeMessenger::default(),
            MemoryOffsetStore::default(),
        );

        h.dispatch.run_once().await.unwrap();
        let sent = h.messenger.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, "Welcome!");
        assert_eq!(h.registry.calls(), 0);
        assert_eq!(h.offsets.read().unwrap(), 21);
    }

    #[tokio::test]
    async fn failed_send_does_not_stop_the_batch() {
        let h = harness(
            Ok(PollResponse {
                ok: true,
                updates: vec![
                    text_update(100, 1, "log"),
                    text_update(101, 2, "orm"),
                    text_update(102, 3, "/start"),
                ],
                description: None,
            }),
            FakeMessenger::failing_for(&[2]),
            MemoryOffsetStore::with_value(100),
        );

        let report = h.dispatch.run_once().await.unwrap();

        assert_eq!(h.messenger.attempts.load(Ordering::SeqCst), 3);
        let chats: Vec<i64> = h.messenger.sent().iter().map(|s| s.0 .0).collect();
        assert_eq!(chats, vec![1, 3]);
        assert_eq!(report.failed, 1);
        assert_eq!(report.sent, 2);
        assert_eq!(h.offsets.read().unwrap(), 103);
    }

    #[tokio::test]
    async fn updates_are_answered_in_received_order() {
        let h = harness(
            Ok(PollResponse {
                ok: true,
                updates: vec![
                    text_update(9, 30, "/start"),
                    text_update(7, 10, "/start"),
                    text_update(8, 20, "/start"),
                ],
                description: None,
            }),
            FakeMessenger::default(),
            MemoryOffsetStore::default(),
        );

        h.dispatch.run_once().await.unwrap();
        let chats: Vec<i64> = h.messenger.sent().iter().map(|s| s.0 .0).collect();
        assert_eq!(chats, vec![30, 10, 20]);
        // Last in the batch, not the highest id.
        assert_eq!(h.offsets.read().unwrap(), 9);
    }

    #[tokio::test]
    async fn max_update_id_is_an_error_without_offset_write() {
        let h = harness(
            Ok(PollResponse {
                ok: true,
                updates: vec![text_update(i64::MAX, 1, "/start")],
                description: None,
            }),
            FakeMessenger::default(),
            MemoryOffsetStore::with_value(i64::MAX),
        );

        let err = h.dispatch.run_once().await.unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
        assert_eq!(h.messenger.sent().len(), 1);
        assert_eq!(h.offsets.writes(), 0);
        assert_eq!(h.offsets.read().unwrap(), i64::MAX);
    }
}
