//! Shared fixtures: a scriptable gateway and a channel-backed listener.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam::channel::{Receiver, Sender, unbounded};
use waymark::{
    Element, ElementRef, GatewayError, NoteId, Quest, QuestGroup, QuestId, QuestListener,
    RemoteGateway, TagChanges,
};

/// Install the global subscriber once per test binary. Later calls are
/// no-ops, so every test may call this freely.
pub fn init_telemetry() {
    let config = waymark::telemetry::TelemetryConfig::new(0, Default::default());
    waymark::telemetry::init(config);
}

/// Scripted outcome for one remote target.
#[derive(Clone, Copy, Debug)]
pub enum Scripted {
    Ok,
    Conflict,
    Transport,
}

/// Gateway that answers from a script (default: success) and logs every call.
#[derive(Default)]
pub struct FakeGateway {
    script: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<String>>,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Script the outcome for a target, keyed by its display form
    /// (`node/1`, `note7`, ...).
    pub fn script(&self, target: impl Into<String>, outcome: Scripted) {
        self.script.lock().unwrap().insert(target.into(), outcome);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn respond(&self, target: String) -> Result<(), GatewayError> {
        self.calls.lock().unwrap().push(target.clone());
        let outcome = self
            .script
            .lock()
            .unwrap()
            .get(&target)
            .copied()
            .unwrap_or(Scripted::Ok);
        match outcome {
            Scripted::Ok => Ok(()),
            Scripted::Conflict => Err(GatewayError::Conflict),
            Scripted::Transport => Err(GatewayError::Transport("connection reset".into())),
        }
    }
}

impl RemoteGateway for FakeGateway {
    fn submit_comment(&self, note: NoteId, _text: &str) -> Result<(), GatewayError> {
        self.respond(note.to_string())
    }

    fn submit_changeset(
        &self,
        element: &ElementRef,
        _changes: &TagChanges,
    ) -> Result<(), GatewayError> {
        self.respond(element.to_string())
    }
}

/// What the presentation layer observed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Seen {
    Created(QuestId, bool),
    Removed(QuestId, QuestGroup),
}

pub struct ChannelListener {
    tx: Sender<Seen>,
}

impl ChannelListener {
    pub fn new() -> (Arc<Self>, Receiver<Seen>) {
        let (tx, rx) = unbounded();
        (Arc::new(Self { tx }), rx)
    }
}

impl QuestListener for ChannelListener {
    fn quest_created(&self, quest: &Quest, element: Option<&Element>) {
        let _ = self.tx.send(Seen::Created(quest.id, element.is_some()));
    }

    fn quest_removed(&self, id: QuestId, group: QuestGroup) {
        let _ = self.tx.send(Seen::Removed(id, group));
    }
}

/// Drain everything the listener saw within the timeout window.
pub fn drain(rx: &Receiver<Seen>) -> Vec<Seen> {
    let mut seen = Vec::new();
    while let Ok(event) = rx.recv_timeout(Duration::from_millis(200)) {
        seen.push(event);
        // Keep draining without waiting once the first event arrived.
        while let Ok(event) = rx.try_recv() {
            seen.push(event);
        }
    }
    seen
}
