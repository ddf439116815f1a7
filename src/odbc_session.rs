// src/odbc_session.rs
use std::{
    sync::mpsc::{self, Receiver, Sender},
    thread::{self, JoinHandle},
    time::Instant,
};

use anyhow::{anyhow, Context, Result};
use odbc::{create_environment_v3, odbc_safe, Data, ResultSetState, Statement};
use tracing::{debug, info, warn};

use crate::profile::ConnectionProfile;
use crate::session::Connector;
use crate::sql::Sql;
use crate::warehouse::{PutRequest, PutResult, RowSet, Warehouse, NULL_SENTINEL};

#[derive(Debug)]
enum DbWorkerRequest {
    Run(Sql),
    Quit,
}

#[derive(Debug)]
enum DbWorkerResponse {
    Connected,
    ConnectFailed(String),
    Finished(std::result::Result<RowSet, String>),
}

/// A warehouse reached through the ODBC driver.
///
/// The environment and connection live on a dedicated thread (a connection
/// borrows its environment, so both are owned by the same stack frame).
/// Calls are still synchronous: one request in, one response out.
pub struct OdbcWarehouse {
    req_tx: Sender<DbWorkerRequest>,
    resp_rx: Receiver<DbWorkerResponse>,
    worker: Option<JoinHandle<()>>,
}

impl OdbcWarehouse {
    /// Connects with `conn_str`; returns once the driver accepted or refused.
    pub fn connect(conn_str: String) -> Result<Self> {
        let (req_tx, req_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();

        let worker = thread::Builder::new()
            .name("odbc-session".into())
            .spawn(move || run_db_worker(conn_str, req_rx, resp_tx))
            .context("Cannot start the ODBC session thread")?;

        match resp_rx.recv() {
            Ok(DbWorkerResponse::Connected) => Ok(Self { req_tx, resp_rx, worker: Some(worker) }),
            Ok(DbWorkerResponse::ConnectFailed(msg)) => {
                let _ = worker.join();
                Err(anyhow!("Connection failed: {msg}"))
            }
            Ok(other) => Err(anyhow!("Unexpected reply from ODBC session: {other:?}")),
            Err(_) => Err(anyhow!("ODBC session thread exited before connecting")),
        }
    }
}

impl Warehouse for OdbcWarehouse {
    fn query(&self, sql: &Sql) -> Result<RowSet> {
        self.req_tx
            .send(DbWorkerRequest::Run(sql.clone()))
            .map_err(|_| anyhow!("ODBC session is closed"))?;
        match self.resp_rx.recv() {
            Ok(DbWorkerResponse::Finished(Ok(rows))) => Ok(rows),
            Ok(DbWorkerResponse::Finished(Err(msg))) => Err(anyhow!(msg)),
            Ok(other) => Err(anyhow!("Unexpected reply from ODBC session: {other:?}")),
            Err(_) => Err(anyhow!("ODBC session is closed")),
        }
    }

    fn put(&self, request: &PutRequest) -> Result<PutResult> {
        let rows = self.query(&request.to_sql())?;
        PutResult::from_rows(&rows)
    }
}

impl Drop for OdbcWarehouse {
    fn drop(&mut self) {
        let _ = self.req_tx.send(DbWorkerRequest::Quit);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_db_worker(
    conn_str: String,
    req_rx: Receiver<DbWorkerRequest>,
    resp_tx: Sender<DbWorkerResponse>,
) {
    let env = match create_environment_v3() {
        Ok(env) => env,
        Err(e) => {
            let msg = match e {
                Some(diag) => format!("Failed to create ODBC environment: {diag}"),
                None => "Failed to create ODBC environment".to_string(),
            };
            let _ = resp_tx.send(DbWorkerResponse::ConnectFailed(msg));
            return;
        }
    };

    let conn = match env.connect_with_connection_string(&conn_str) {
        Ok(conn) => conn,
        Err(e) => {
            let _ = resp_tx.send(DbWorkerResponse::ConnectFailed(e.to_string()));
            return;
        }
    };
    let _ = resp_tx.send(DbWorkerResponse::Connected);

    loop {
        match req_rx.recv() {
            Ok(DbWorkerRequest::Run(sql)) => {
                let started = Instant::now();
                let result = run_statement(&conn, &sql).map_err(|e| format!("Execution Error: {e}"));
                match &result {
                    Ok(rows) => debug!(rows = rows.rows.len(), elapsed = ?started.elapsed(), "statement finished"),
                    Err(msg) => warn!(error = %msg, elapsed = ?started.elapsed(), "statement failed"),
                }
                if resp_tx.send(DbWorkerResponse::Finished(result)).is_err() {
                    break;
                }
            }
            Ok(DbWorkerRequest::Quit) | Err(_) => break,
        }
    }
    info!("ODBC session closed");
}

fn run_statement<'env>(
    conn: &odbc::Connection<'env, odbc_safe::AutocommitOn>,
    sql: &Sql,
) -> Result<RowSet> {
    let mut stmt = Statement::with_parent(conn)?;
    for (i, value) in sql.params.iter().enumerate() {
        stmt = stmt.bind_parameter(i as u16 + 1, value)?;
    }

    match stmt.exec_direct(&sql.text)? {
        Data(mut stmt) => {
            let cols = stmt.num_result_cols()?;
            let mut headers = Vec::with_capacity(cols.max(0) as usize);
            for i in 1..=cols {
                headers.push(stmt.describe_col(i as u16)?.name);
            }

            let mut rows = Vec::new();
            while let Some(mut cursor) = stmt.fetch()? {
                let mut row = Vec::with_capacity(headers.len());
                for idx in 0..headers.len() {
                    let val: Option<String> = cursor.get_data(idx as u16 + 1)?;
                    row.push(val.unwrap_or_else(|| NULL_SENTINEL.to_string()));
                }
                rows.push(row);
            }
            Ok(RowSet::new(headers, rows))
        }
        ResultSetState::NoData(_) => Ok(RowSet::default()),
    }
}

/// Opens [`OdbcWarehouse`] sessions through the configured driver.
pub struct OdbcConnector {
    pub driver: String,
}

impl OdbcConnector {
    pub fn new(driver: impl Into<String>) -> Self {
        Self { driver: driver.into() }
    }
}

impl Connector for OdbcConnector {
    fn open(&self, profile: &ConnectionProfile) -> Result<Box<dyn Warehouse>> {
        info!(account = %profile.account, user = %profile.user, driver = %self.driver, "opening ODBC connection");
        let warehouse = OdbcWarehouse::connect(profile.connection_string(&self.driver))?;
        Ok(Box::new(warehouse))
    }
}
