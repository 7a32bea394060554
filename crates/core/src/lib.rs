// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! msgcode-core: shared data model and error kinds for the msgcode daemon.

pub mod classification;
pub mod config;
pub mod cursor;
pub mod envelope;
pub mod error;
pub mod ids;
pub mod inbound;
pub mod queue;
pub mod route;
pub mod soul;
pub mod summary;
pub mod thread;
pub mod time;
pub mod tool;
pub mod window;

pub use classification::{Confidence, Route, RouteClassification};
pub use config::{DefaultRunner, WorkspaceConfig, DEFAULT_WORKSPACE_CONFIG};
pub use cursor::ChatCursor;
pub use envelope::{Envelope, EnvelopeStatus, EnvelopeSummary};
pub use error::{CoreError, ErrorKind};
pub use ids::{new_request_id, new_thread_id, ShortId};
pub use inbound::{Attachment, InboundMessage};
pub use queue::QueuedMessage;
pub use route::{RouteEntry, RouteStatus};
pub use soul::{SoulResolution, SoulSource};
pub use summary::Summary;
pub use thread::ThreadInfo;
pub use tool::{ToolEvent, ToolMode, ToolPolicy, ToolSource};
pub use window::{Role, ToolCallRef, WindowMessage};
