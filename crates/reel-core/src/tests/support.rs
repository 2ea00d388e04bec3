use crate::{BackendGateway, CoreResult, SyncError};

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use serde_json::Value;

#[derive(Clone)]
enum Scripted {
    Reply(Value),
    Fail(String),
}

/// Gateway answering from per-command scripts.
///
/// Queued replies are consumed first; once a command's queue is empty its
/// sticky reply (if any) answers every further call. Unscripted commands fail
/// in transport.
#[derive(Default)]
pub(crate) struct ScriptedGateway {
    queued: Mutex<HashMap<String, VecDeque<Scripted>>>,
    sticky: Mutex<HashMap<String, Scripted>>,
    log: Mutex<Vec<(String, Value)>>,
    latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[allow(clippy::unwrap_used)]
impl ScriptedGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Queue one reply for `command`.
    pub(crate) fn reply(&self, command: &str, value: Value) -> &Self {
        self.push(command, Scripted::Reply(value))
    }

    /// Queue one transport failure for `command`.
    pub(crate) fn fail(&self, command: &str, reason: &str) -> &Self {
        self.push(command, Scripted::Fail(reason.to_string()))
    }

    /// Answer `command` with `value` once its queue is empty.
    pub(crate) fn always(&self, command: &str, value: Value) -> &Self {
        self.sticky
            .lock()
            .unwrap()
            .insert(command.to_string(), Scripted::Reply(value));
        self
    }

    pub(crate) fn calls(&self, command: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == command)
            .count()
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub(crate) fn last_args(&self, command: &str) -> Option<Value> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(name, _)| name == command)
            .map(|(_, args)| args.clone())
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn push(&self, command: &str, scripted: Scripted) -> &Self {
        self.queued
            .lock()
            .unwrap()
            .entry(command.to_string())
            .or_default()
            .push_back(scripted);
        self
    }

    fn next(&self, command: &str) -> Option<Scripted> {
        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(command)
            .and_then(VecDeque::pop_front);

        queued.or_else(|| self.sticky.lock().unwrap().get(command).cloned())
    }
}

#[async_trait]
impl BackendGateway for ScriptedGateway {
    #[allow(clippy::unwrap_used)]
    async fn invoke(&self, command: &str, args: Value) -> CoreResult<Value> {
        self.log
            .lock()
            .unwrap()
            .push((command.to_string(), args));

        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.next(command) {
            Some(Scripted::Reply(value)) => Ok(value),
            Some(Scripted::Fail(reason)) => Err(SyncError::transport(command, reason)),
            None => Err(SyncError::transport(command, "unscripted command")),
        }
    }
}
