// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Steering Queues (C9, spec §4.9): per-chat in-memory FIFO queues for
//! mid-run steer messages and post-run follow-ups. Nothing here persists
//! across a daemon restart — both queues live for the process lifetime.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

#[derive(Default)]
struct ChatQueues {
    steer: VecDeque<String>,
    follow_up: VecDeque<String>,
}

/// Guards both queues behind one lock per chat so `hasSteer` never races
/// `drainSteer` within the same chat.
#[derive(Default)]
pub struct SteeringQueues {
    chats: Mutex<HashMap<String, ChatQueues>>,
}

impl SteeringQueues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_steer(&self, chat_id: &str, message: impl Into<String>) {
        self.chats
            .lock()
            .entry(chat_id.to_string())
            .or_default()
            .steer
            .push_back(message.into());
    }

    /// Drains and returns all queued steer messages, in FIFO order.
    pub fn drain_steer(&self, chat_id: &str) -> Vec<String> {
        self.chats
            .lock()
            .get_mut(chat_id)
            .map(|q| q.steer.drain(..).collect())
            .unwrap_or_default()
    }

    pub fn has_steer(&self, chat_id: &str) -> bool {
        self.chats
            .lock()
            .get(chat_id)
            .map(|q| !q.steer.is_empty())
            .unwrap_or(false)
    }

    pub fn push_follow_up(&self, chat_id: &str, message: impl Into<String>) {
        self.chats
            .lock()
            .entry(chat_id.to_string())
            .or_default()
            .follow_up
            .push_back(message.into());
    }

    pub fn drain_follow_up(&self, chat_id: &str) -> Vec<String> {
        self.chats
            .lock()
            .get_mut(chat_id)
            .map(|q| q.follow_up.drain(..).collect())
            .unwrap_or_default()
    }

    /// Consumes exactly one queued follow-up (spec §4.9: "the tool loop
    /// drains at most one follow-up per idle round").
    pub fn consume_one_follow_up(&self, chat_id: &str) -> Option<String> {
        self.chats.lock().get_mut(chat_id).and_then(|q| q.follow_up.pop_front())
    }

    pub fn has_follow_up(&self, chat_id: &str) -> bool {
        self.chats
            .lock()
            .get(chat_id)
            .map(|q| !q.follow_up.is_empty())
            .unwrap_or(false)
    }
}
