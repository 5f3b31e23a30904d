//! Shared harness for gate integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chanlink::config::Config;
use chanlink::db::Database;
use chanlink::services::{Gate, MembershipProbe, ProbeError};
use std::collections::HashSet;
use std::sync::Mutex;

pub const OWNER_ID: i64 = 1000;

/// Gate over a fresh in-memory store.
pub async fn test_gate() -> Gate {
    let config = Config::parse(&format!(
        r#"
        [bot]
        username = "chanlink_test_bot"
        owner_id = {OWNER_ID}
        metrics_port = 0
        "#
    ))
    .expect("test config parses");
    let db = Database::connect(":memory:")
        .await
        .expect("in-memory database opens");
    Gate::new(db, &config)
}

/// Membership probe backed by a mutable member set.
#[derive(Default)]
pub struct TestProbe {
    members: Mutex<HashSet<(i64, i64)>>,
    failing: Mutex<HashSet<i64>>,
}

impl TestProbe {
    pub fn join(&self, channel_id: i64, user_id: i64) {
        self.members.lock().unwrap().insert((channel_id, user_id));
    }

    pub fn leave(&self, channel_id: i64, user_id: i64) {
        self.members.lock().unwrap().remove(&(channel_id, user_id));
    }

    /// Make every probe of `channel_id` fail.
    pub fn break_channel(&self, channel_id: i64) {
        self.failing.lock().unwrap().insert(channel_id);
    }
}

#[async_trait]
impl MembershipProbe for TestProbe {
    async fn is_member(&self, channel_id: i64, user_id: i64) -> Result<bool, ProbeError> {
        if self.failing.lock().unwrap().contains(&channel_id) {
            return Err(ProbeError(format!("channel {channel_id} unreachable")));
        }
        Ok(self.members.lock().unwrap().contains(&(channel_id, user_id)))
    }
}
