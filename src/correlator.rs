use crate::error::{Result, X32Error};
use crate::protocol::{Message, WireValue};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, watch, Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::{self, timeout_at};

type Reply = Result<Vec<WireValue>>;

/// A call waiting for the reply on its address
struct PendingCall {
    id: u64,
    created: Instant,
    reply_tx: oneshot::Sender<Reply>,
}

/// Per-address queue. `users` counts callers holding or waiting for `lock`.
struct Gate {
    lock: Arc<AsyncMutex<()>>,
    users: usize,
}

/// Matches inbound messages to in-flight calls by address.
///
/// At most one call per address is in flight. Further calls on the same
/// address wait on a per-address gate, so a reply can never be attributed
/// to the wrong caller. Every call belongs to the epoch it started in;
/// `fail_all` ends the epoch, which also fails calls still queued on a gate.
pub(crate) struct Correlator {
    pending: Mutex<HashMap<String, PendingCall>>,
    gates: Mutex<HashMap<String, Gate>>,
    epoch: watch::Sender<u64>,
    next_id: AtomicU64,
}

impl Correlator {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            epoch: watch::Sender::new(0),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a waiter for `address`, run `send`, then wait for the reply.
    /// Returns every argument of the matching message.
    ///
    /// `window` runs from the moment of the call, so time spent queued
    /// behind another call on the same address counts against it. A call
    /// whose window ends while queued never transmits.
    pub async fn call<F>(&self, address: &str, window: Duration, send: F) -> Result<Vec<WireValue>>
    where
        F: Future<Output = Result<()>>,
    {
        let deadline = time::Instant::now() + window;
        let mut closed = self.epoch.subscribe();
        let epoch = *closed.borrow_and_update();
        let timed_out = || {
            tracing::debug!("No reply for {} within {:?}", address, window);
            X32Error::Timeout {
                address: address.to_string(),
            }
        };

        let (ticket, gate) = self.enter_gate(address);
        let held = tokio::select! {
            biased;
            _ = closed.changed() => return Err(X32Error::Closed),
            held = timeout_at(deadline, gate.lock_owned()) => match held {
                Ok(held) => held,
                Err(_) => return Err(timed_out()),
            },
        };
        if time::Instant::now() >= deadline {
            return Err(timed_out());
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        // Removes the entry on every exit path, including a dropped future
        let _guard = PendingGuard {
            correlator: self,
            address,
            id,
            _held: held,
            _ticket: ticket,
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        {
            // Checked under the table lock so fail_all cannot slip in between
            let mut table = self.table();
            if *self.epoch.borrow() != epoch {
                return Err(X32Error::Closed);
            }
            table.insert(
                address.to_string(),
                PendingCall {
                    id,
                    created: Instant::now(),
                    reply_tx,
                },
            );
        }

        tokio::select! {
            biased;
            _ = closed.changed() => return Err(X32Error::Closed),
            sent = send => sent?,
        }

        match timeout_at(deadline, reply_rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(X32Error::Closed),
            Err(_) => Err(timed_out()),
        }
    }

    /// Hand `message` to the call waiting on its address.
    ///
    /// Returns the message back when nothing was waiting for it.
    pub fn resolve(&self, message: Message) -> Option<Message> {
        let call = self.table().remove(&message.address);
        match call {
            Some(call) => {
                tracing::debug!(
                    "Resolved {} after {:?}",
                    message.address,
                    call.created.elapsed()
                );
                // Receiver gone means the caller already gave up
                let _ = call.reply_tx.send(Ok(message.args));
                None
            }
            None => Some(message),
        }
    }

    /// End the current epoch: fail every pending call with `Closed`,
    /// including calls still queued behind another on the same address
    pub fn fail_all(&self) {
        let drained: Vec<_> = {
            let mut table = self.table();
            self.epoch.send_modify(|epoch| *epoch += 1);
            table.drain().collect()
        };
        for (address, call) in drained {
            tracing::debug!("Failing pending call on {}", address);
            let _ = call.reply_tx.send(Err(X32Error::Closed));
        }
    }

    /// Number of calls currently waiting for a reply
    pub fn pending_count(&self) -> usize {
        self.table().len()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, PendingCall>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn gates(&self) -> MutexGuard<'_, HashMap<String, Gate>> {
        self.gates.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter_gate<'a>(&'a self, address: &'a str) -> (GateTicket<'a>, Arc<AsyncMutex<()>>) {
        let mut gates = self.gates();
        let gate = gates.entry(address.to_string()).or_insert_with(|| Gate {
            lock: Arc::new(AsyncMutex::new(())),
            users: 0,
        });
        gate.users += 1;
        let ticket = GateTicket {
            correlator: self,
            address,
        };
        (ticket, gate.lock.clone())
    }

    fn leave_gate(&self, address: &str) {
        let mut gates = self.gates();
        let Some(gate) = gates.get_mut(address) else {
            return;
        };
        gate.users = gate.users.saturating_sub(1);
        if gate.users == 0 {
            gates.remove(address);
        }
    }

    fn forget(&self, address: &str, id: u64) {
        let mut table = self.table();
        if table.get(address).is_some_and(|call| call.id == id) {
            table.remove(address);
        }
    }
}

/// Membership in a gate's queue, held while waiting and while in flight
struct GateTicket<'a> {
    correlator: &'a Correlator,
    address: &'a str,
}

impl Drop for GateTicket<'_> {
    fn drop(&mut self) {
        self.correlator.leave_gate(self.address);
    }
}

struct PendingGuard<'a> {
    correlator: &'a Correlator,
    address: &'a str,
    id: u64,
    _held: OwnedMutexGuard<()>,
    _ticket: GateTicket<'a>,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.correlator.forget(self.address, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    const WINDOW: Duration = Duration::from_millis(500);

    fn reply(address: &str, value: f32) -> Message {
        Message {
            address: address.to_string(),
            args: vec![WireValue::Float(value)],
        }
    }

    /// Spawn a call whose "send" reports the address on `sent_tx`
    fn spawn_call(
        correlator: &Arc<Correlator>,
        address: &'static str,
        window: Duration,
        sent_tx: mpsc::UnboundedSender<&'static str>,
    ) -> tokio::task::JoinHandle<Result<Vec<WireValue>>> {
        let correlator = correlator.clone();
        tokio::spawn(async move {
            correlator
                .call(address, window, async move {
                    let _ = sent_tx.send(address);
                    Ok(())
                })
                .await
        })
    }

    #[tokio::test]
    async fn matching_reply_resolves_call() {
        let correlator = Arc::new(Correlator::new());
        let (sent_tx, mut sent_rx) = mpsc::unbounded_channel();
        let call = spawn_call(&correlator, "/ch/01/mix/fader", WINDOW, sent_tx);

        assert_eq!(sent_rx.recv().await, Some("/ch/01/mix/fader"));
        assert!(correlator.resolve(reply("/ch/01/mix/fader", 0.5)).is_none());

        let args = call.await.unwrap().unwrap();
        assert_eq!(args, vec![WireValue::Float(0.5)]);
        assert_eq!(correlator.pending_count(), 0);
    }

    #[tokio::test]
    async fn other_address_does_not_resolve() {
        let correlator = Arc::new(Correlator::new());
        let (sent_tx, mut sent_rx) = mpsc::unbounded_channel();
        let call = spawn_call(&correlator, "/ch/01/mix/fader", WINDOW, sent_tx);
        sent_rx.recv().await;

        let unmatched = correlator.resolve(reply("/ch/02/mix/fader", 0.9));
        assert_eq!(unmatched, Some(reply("/ch/02/mix/fader", 0.9)));
        assert_eq!(correlator.pending_count(), 1);

        correlator.resolve(reply("/ch/01/mix/fader", 0.1));
        assert_eq!(call.await.unwrap().unwrap(), vec![WireValue::Float(0.1)]);
    }

    #[tokio::test]
    async fn timeout_removes_pending_call() {
        let correlator = Arc::new(Correlator::new());
        let (sent_tx, _sent_rx) = mpsc::unbounded_channel();
        let call = spawn_call(&correlator, "/ch/01/mix/pan", Duration::from_millis(50), sent_tx);

        let err = call.await.unwrap().unwrap_err();
        assert!(matches!(err, X32Error::Timeout { ref address } if address == "/ch/01/mix/pan"));
        assert_eq!(correlator.pending_count(), 0);

        // Late reply is handed back, not misapplied
        assert!(correlator.resolve(reply("/ch/01/mix/pan", 0.5)).is_some());
    }

    #[tokio::test]
    async fn fail_all_closes_pending_calls() {
        let correlator = Arc::new(Correlator::new());
        let (sent_tx, mut sent_rx) = mpsc::unbounded_channel();
        let a = spawn_call(&correlator, "/ch/01/mix/fader", WINDOW, sent_tx.clone());
        let b = spawn_call(&correlator, "/bus/01/mix/fader", WINDOW, sent_tx);
        sent_rx.recv().await;
        sent_rx.recv().await;

        correlator.fail_all();

        assert!(matches!(a.await.unwrap(), Err(X32Error::Closed)));
        assert!(matches!(b.await.unwrap(), Err(X32Error::Closed)));
        assert_eq!(correlator.pending_count(), 0);
    }

    #[tokio::test]
    async fn send_failure_leaves_nothing_pending() {
        let correlator = Correlator::new();
        let result = correlator
            .call("/ch/01/mix/fader", WINDOW, async { Err(X32Error::NotConnected) })
            .await;
        assert!(matches!(result, Err(X32Error::NotConnected)));
        assert_eq!(correlator.pending_count(), 0);
        assert!(correlator.gates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn same_address_calls_are_serialized() {
        let correlator = Arc::new(Correlator::new());
        let (sent_tx, mut sent_rx) = mpsc::unbounded_channel();
        let first = spawn_call(&correlator, "/info", WINDOW, sent_tx.clone());
        assert_eq!(sent_rx.recv().await, Some("/info"));

        let second = spawn_call(&correlator, "/info", WINDOW, sent_tx);
        // Second call must not transmit while the first is in flight
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sent_rx.try_recv().is_err());

        correlator.resolve(reply("/info", 1.0));
        assert_eq!(first.await.unwrap().unwrap(), vec![WireValue::Float(1.0)]);

        assert_eq!(sent_rx.recv().await, Some("/info"));
        correlator.resolve(reply("/info", 2.0));
        assert_eq!(second.await.unwrap().unwrap(), vec![WireValue::Float(2.0)]);
        assert!(correlator.gates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn dropped_call_cleans_up() {
        let correlator = Arc::new(Correlator::new());
        let (sent_tx, mut sent_rx) = mpsc::unbounded_channel();
        let call = spawn_call(&correlator, "/status", WINDOW, sent_tx);
        sent_rx.recv().await;
        assert_eq!(correlator.pending_count(), 1);

        call.abort();
        let _ = call.await;
        assert_eq!(correlator.pending_count(), 0);
    }

    #[tokio::test]
    async fn fail_all_closes_queued_calls() {
        let correlator = Arc::new(Correlator::new());
        let (sent_tx, mut sent_rx) = mpsc::unbounded_channel();
        let first = spawn_call(&correlator, "/status", WINDOW, sent_tx.clone());
        assert_eq!(sent_rx.recv().await, Some("/status"));
        let queued = spawn_call(&correlator, "/status", WINDOW, sent_tx);
        tokio::time::sleep(Duration::from_millis(20)).await;

        correlator.fail_all();

        assert!(matches!(first.await.unwrap(), Err(X32Error::Closed)));
        assert!(matches!(queued.await.unwrap(), Err(X32Error::Closed)));
        // The queued call never transmitted
        assert!(sent_rx.try_recv().is_err());
        assert!(correlator.gates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn calls_after_fail_all_still_work() {
        let correlator = Arc::new(Correlator::new());
        correlator.fail_all();

        let (sent_tx, mut sent_rx) = mpsc::unbounded_channel();
        let call = spawn_call(&correlator, "/info", WINDOW, sent_tx);
        assert_eq!(sent_rx.recv().await, Some("/info"));
        correlator.resolve(reply("/info", 3.0));
        assert_eq!(call.await.unwrap().unwrap(), vec![WireValue::Float(3.0)]);
    }

    #[tokio::test]
    async fn window_includes_time_spent_queued() {
        let correlator = Arc::new(Correlator::new());
        let (sent_tx, _sent_rx) = mpsc::unbounded_channel();
        let window = Duration::from_millis(100);
        let started = tokio::time::Instant::now();

        let calls: Vec<_> = (0..4)
            .map(|_| spawn_call(&correlator, "/info", window, sent_tx.clone()))
            .collect();
        for call in calls {
            assert!(matches!(call.await.unwrap(), Err(X32Error::Timeout { .. })));
            assert!(started.elapsed() < Duration::from_millis(180), "took {:?}", started.elapsed());
        }
        assert_eq!(correlator.pending_count(), 0);
        assert!(correlator.gates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancelled_waiter_releases_gate() {
        let correlator = Arc::new(Correlator::new());
        let (sent_tx, mut sent_rx) = mpsc::unbounded_channel();
        let first = spawn_call(&correlator, "/status", WINDOW, sent_tx.clone());
        sent_rx.recv().await;
        let queued = spawn_call(&correlator, "/status", WINDOW, sent_tx);
        tokio::time::sleep(Duration::from_millis(20)).await;

        // The holder finishes and the waiter is cancelled before it runs
        correlator.resolve(reply("/status", 1.0));
        queued.abort();

        assert!(first.await.unwrap().is_ok());
        let _ = queued.await;
        assert!(correlator.gates.lock().unwrap().is_empty());
    }
}
