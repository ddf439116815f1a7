// src/session.rs
//! The application context: at most one authenticated warehouse session,
//! created on the first successful `connect` and reused afterwards.
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::profile::ConnectionProfile;
use crate::sql;
use crate::warehouse::Warehouse;

/// Opens a warehouse for a profile. Production uses ODBC; tests use fakes.
pub trait Connector {
    fn open(&self, profile: &ConnectionProfile) -> Result<Box<dyn Warehouse>>;
}

/// "Connection details" shown in the sidebar after login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub account: String,
    pub user: String,
    pub role: String,
    pub version: String,
    pub warehouse: String,
}

impl SessionInfo {
    /// Pretty JSON, the way the details are shown in the sidebar.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

pub struct Session {
    warehouse: Box<dyn Warehouse>,
    info: SessionInfo,
}

impl Session {
    pub fn warehouse(&self) -> &dyn Warehouse {
        self.warehouse.as_ref()
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }
}

#[derive(Default)]
pub struct AppContext {
    session: Option<Session>,
}

impl AppContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn warehouse(&self) -> Option<&dyn Warehouse> {
        self.session.as_ref().map(Session::warehouse)
    }

    /// Returns the existing session untouched, ignoring `profile`, or opens
    /// a new one. On failure the context stays disconnected.
    pub fn connect(
        &mut self,
        profile: &ConnectionProfile,
        connector: &dyn Connector,
    ) -> Result<&Session> {
        if self.session.is_none() {
            profile.validate()?;
            let warehouse = connector.open(profile)?;
            let info = introspect(warehouse.as_ref(), profile).map_err(|e| {
                warn!(error = %e, "session introspection failed");
                e
            })?;
            info!(account = %info.account, user = %info.user, role = %info.role, warehouse = %info.warehouse, "connected");
            self.session = Some(Session { warehouse, info });
        }
        self.session
            .as_ref()
            .context("session missing right after connect")
    }

    /// Drops the session; the next `connect` opens a fresh one.
    pub fn disconnect(&mut self) -> bool {
        let had_session = self.session.take().is_some();
        if had_session {
            info!("disconnected");
        }
        had_session
    }
}

fn introspect(warehouse: &dyn Warehouse, profile: &ConnectionProfile) -> Result<SessionInfo> {
    let rows = warehouse
        .query(&sql::session_introspection())
        .context("Cannot read session details")?;
    let row = rows.rows.first().context("Session details query returned no rows")?;
    let col = |i: usize| row.get(i).cloned().unwrap_or_default();
    Ok(SessionInfo {
        account: profile.account.clone(),
        user: col(1),
        role: col(2),
        version: col(3),
        warehouse: col(4),
    })
}
