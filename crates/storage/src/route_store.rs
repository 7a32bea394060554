// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Route Store (C2): durable `chatGuid` → workspace binding map (spec §4.2).

use crate::atomic::{read_json, write_json, AtomicStoreError};
use chrono::Utc;
use msgcode_core::{RouteEntry, RouteStatus};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

const VERSION: u32 = 1;
const CHAT_GUID_PREFIX: &str = "any;+;";

#[derive(Debug, Error)]
pub enum RouteStoreError {
    #[error(transparent)]
    Store(#[from] AtomicStoreError),
    #[error("route store version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("relative path escapes WORKSPACE_ROOT: {0}")]
    PathUnsafe(String),
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct RouteFile {
    version: u32,
    routes: HashMap<String, RouteEntry>,
}

/// Normalize a raw chat identifier into the `any;+;<id>` chatGuid form used
/// as the map key, unless it is already normalized.
pub fn normalize_chat_guid(id: &str) -> String {
    if id.starts_with(CHAT_GUID_PREFIX) {
        id.to_string()
    } else {
        format!("{CHAT_GUID_PREFIX}{id}")
    }
}

pub struct RouteStore {
    path: PathBuf,
    workspace_root: PathBuf,
    routes: HashMap<String, RouteEntry>,
}

impl RouteStore {
    pub fn load(path: &Path, workspace_root: &Path) -> Result<Self, RouteStoreError> {
        let mut repaired = false;
        let routes = match read_json::<serde_json::Value>(path)? {
            None => HashMap::new(),
            Some(raw) => {
                let version = raw.get("version").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
                if version != VERSION && raw.get("version").is_some() {
                    return Err(RouteStoreError::VersionMismatch {
                        expected: VERSION,
                        found: version,
                    });
                }
                let mut routes = HashMap::new();
                if let Some(obj) = raw.get("routes").and_then(|v| v.as_object()) {
                    for (guid, entry_raw) in obj {
                        match parse_route_entry(entry_raw, &mut repaired) {
                            Some(entry) => {
                                routes.insert(guid.clone(), entry);
                            }
                            None => warn!(chat_guid = %guid, "dropping unparseable route entry"),
                        }
                    }
                }
                routes
            }
        };
        let store = Self {
            path: path.to_path_buf(),
            workspace_root: workspace_root.to_path_buf(),
            routes,
        };
        if repaired {
            store.persist()?;
        }
        Ok(store)
    }

    fn persist(&self) -> Result<(), RouteStoreError> {
        let file = RouteFile {
            version: VERSION,
            routes: self.routes.clone(),
        };
        write_json(&self.path, &file)?;
        Ok(())
    }

    pub fn save(&self) -> Result<(), RouteStoreError> {
        self.persist()
    }

    /// Match a chatId, normalizing if it lacks the `any;+;` prefix.
    pub fn get_by_chat_id(&self, id: &str) -> Option<&RouteEntry> {
        self.routes.get(id).or_else(|| self.routes.get(&normalize_chat_guid(id)))
    }

    pub fn set_route(&mut self, entry: RouteEntry) {
        self.routes.insert(entry.chat_guid.clone(), entry);
    }

    pub fn delete_route(&mut self, chat_guid: &str) -> Option<RouteEntry> {
        self.routes.remove(chat_guid)
    }

    pub fn update_route_status(&mut self, chat_guid: &str, status: RouteStatus) -> bool {
        if let Some(entry) = self.routes.get_mut(chat_guid) {
            entry.status = status;
            entry.updated_at = Utc::now();
            true
        } else {
            false
        }
    }

    pub fn get_active_routes(&self) -> Vec<&RouteEntry> {
        self.routes.values().filter(|r| r.status == RouteStatus::Active).collect()
    }

    /// Resolve `rel_path` under `WORKSPACE_ROOT`, create the directory, and
    /// record the entry. Rejects `..` or absolute paths (spec §4.2).
    pub fn create_route(
        &mut self,
        chat_guid: &str,
        rel_path: &str,
        bot_type: &str,
    ) -> Result<RouteEntry, RouteStoreError> {
        let rel = Path::new(rel_path);
        if rel.is_absolute() || rel.components().any(|c| c == std::path::Component::ParentDir) {
            return Err(RouteStoreError::PathUnsafe(rel_path.to_string()));
        }
        let workspace_path = self.workspace_root.join(rel);
        std::fs::create_dir_all(&workspace_path).map_err(AtomicStoreError::Io)?;
        let now = Utc::now();
        let entry = RouteEntry {
            chat_guid: chat_guid.to_string(),
            chat_id: chat_guid.to_string(),
            workspace_path,
            label: rel_path.to_string(),
            bot_type: bot_type.to_string(),
            status: RouteStatus::Active,
            created_at: now,
            updated_at: now,
        };
        self.set_route(entry.clone());
        Ok(entry)
    }
}

fn parse_route_entry(raw: &serde_json::Value, repaired: &mut bool) -> Option<RouteEntry> {
    let obj = raw.as_object()?;
    let chat_guid = obj.get("chat_guid")?.as_str()?.to_string();
    let chat_id = obj.get("chat_id")?.as_str().unwrap_or(&chat_guid).to_string();
    let workspace_path = PathBuf::from(obj.get("workspace_path")?.as_str()?);
    let label = obj.get("label").and_then(|v| v.as_str()).unwrap_or("").to_string();
    let bot_type = obj.get("bot_type").and_then(|v| v.as_str()).unwrap_or("").to_string();
    let status: RouteStatus = obj
        .get("status")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or(RouteStatus::Active);
    let created_at = parse_or_repair_timestamp(obj.get("created_at"), repaired);
    let updated_at = parse_or_repair_timestamp(obj.get("updated_at"), repaired);
    Some(RouteEntry {
        chat_guid,
        chat_id,
        workspace_path,
        label,
        bot_type,
        status,
        created_at,
        updated_at,
    })
}

fn parse_or_repair_timestamp(
    value: Option<&serde_json::Value>,
    repaired: &mut bool,
) -> chrono::DateTime<Utc> {
    let parsed = value
        .and_then(|v| v.as_str())
        .and_then(msgcode_core::time::parse_rfc3339);
    match parsed {
        Some(dt) => dt,
        None => {
            *repaired = true;
            Utc::now()
        }
    }
}
