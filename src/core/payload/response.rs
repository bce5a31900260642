// src/core/payload/response.rs

//! Classifies inbound CommandHandler frames as responses or unsolicited traffic.
//!
//! The wire protocol has no type tag. A frame is a response when it is a JSON
//! object with the node identifier field plus at least one documented status field.

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde_json::Value;

/// Field carrying the responding node's identifier.
pub const NODE_ID_FIELD: &str = "N_id";

/// Status fields of the documented response schema.
pub const STATUS_FIELDS: [&str; 7] = ["GN", "GU", "zC", "sC", "sCon", "sR", "lCD"];

/// A structured response from the base board.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResponse {
    pub node_id: String,
    /// Every field of the response object, in wire order, including `N_id`.
    pub fields: IndexMap<String, Value>,
    pub received_at: DateTime<Local>,
}

impl CommandResponse {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// The documented status fields present in this response, in schema order.
    pub fn status_fields(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        STATUS_FIELDS
            .iter()
            .filter_map(|name| self.fields.get(*name).map(|v| (*name, v)))
    }
}

/// How an inbound CommandHandler frame was classified.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Response(CommandResponse),
    /// A command echo, log line, or anything else not matching the response schema.
    Unsolicited(String),
}

/// Applies the response heuristic to a frame payload.
pub fn classify_inbound(text: &str) -> Inbound {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text.trim()) else {
        return Inbound::Unsolicited(text.to_string());
    };

    let node_id = match map.get(NODE_ID_FIELD) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Inbound::Unsolicited(text.to_string()),
    };
    if !STATUS_FIELDS.iter().any(|f| map.contains_key(*f)) {
        return Inbound::Unsolicited(text.to_string());
    }

    Inbound::Response(CommandResponse {
        node_id,
        fields: map.into_iter().collect(),
        received_at: Local::now(),
    })
}
