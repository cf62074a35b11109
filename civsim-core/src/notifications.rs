//! Notification events emitted toward the presentation layer.
//!
//! The core only records; nothing here feeds back into simulation phases.
//! Serialized with serde's tag format for clean consumption:
//! `{"category":"units","text":"...","location":{"q":1,"r":0}}`.

use crate::hex::HexCoord;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    General,
    Units,
    Cities,
    Production,
    Science,
    Religion,
    Diplomacy,
    Trade,
    War,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub text: String,
    pub category: NotificationCategory,
    pub location: Option<HexCoord>,
    /// Icon keys for the presentation layer; opaque to the core.
    pub icons: Vec<String>,
}

/// One turn's worth of archived notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnNotifications {
    pub turn: u32,
    pub notifications: Vec<Notification>,
}

/// Per-civilization notification log with bounded turn retention.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationLog {
    /// Notifications emitted since the last rotation.
    pub current: Vec<Notification>,
    /// Most recent turn first.
    pub history: VecDeque<TurnNotifications>,
}

impl NotificationLog {
    pub fn add(
        &mut self,
        text: impl Into<String>,
        category: NotificationCategory,
        location: Option<HexCoord>,
        icons: &[&str],
    ) {
        self.current.push(Notification {
            text: text.into(),
            category,
            location,
            icons: icons.iter().map(|s| s.to_string()).collect(),
        });
    }

    /// Archive the current turn's notifications and drop archives older than
    /// `max_turns`. Called once per civilization at end of turn.
    pub fn rotate(&mut self, turn: u32, max_turns: usize) {
        let notifications = std::mem::take(&mut self.current);
        self.history.push_front(TurnNotifications {
            turn,
            notifications,
        });
        while self.history.len() > max_turns {
            self.history.pop_back();
        }
    }
}
