// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Program-management executor.
//!
//! A rising edge on `...<M>.ProgramManagement.Ctrl` copies the requested
//! program file into the per-machine staging directory and issues
//! `SelectMainProgram`. Whatever happens, `Stat` is written `true` on
//! terminal completion so the orchestrator watching OPC UA always observes
//! the workflow finishing; success and failure are distinguished by
//! `Exception` being empty or not.
//!
//! A falling edge on `Ctrl` writes `Stat := false` and nothing else.
//!
//! Failures that should have been impossible are additionally serialized to
//! a crash-dump file `Exception_<yyyy-MM-dd_HH-mm-ss>_<machineId>.txt` in
//! the working directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use tracing::{info, warn};

use crate::address::MachinePaths;
use crate::control::{read_string, ControlPlane};
use crate::error::{ProgramError, ProgramResult};
use crate::pool::SessionPool;
use crate::types::{MachineId, MachineName, PlaneValue};

/// Default staging root; programs stage to `<root>\<ip>\<filename>`.
pub const DEFAULT_STAGING_ROOT: &str = r"C:\temp";

/// Executes program-management workflows.
pub struct ProgramExecutor {
    plane: Arc<dyn ControlPlane>,
    pool: Arc<SessionPool>,
    staging_root: PathBuf,
    dump_dir: PathBuf,
}

/// Parameters read off the control plane on a rising edge.
#[derive(Debug, Clone, Default)]
struct ProgramRequest {
    filepath: String,
    id: String,
    main_file: String,
}

impl ProgramExecutor {
    /// Creates an executor with the default staging root and the working
    /// directory for crash dumps.
    pub fn new(plane: Arc<dyn ControlPlane>, pool: Arc<SessionPool>) -> Self {
        Self {
            plane,
            pool,
            staging_root: PathBuf::from(DEFAULT_STAGING_ROOT),
            dump_dir: PathBuf::from("."),
        }
    }

    /// Overrides the staging root.
    pub fn with_staging_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.staging_root = root.into();
        self
    }

    /// Overrides the crash-dump directory.
    pub fn with_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dump_dir = dir.into();
        self
    }

    /// Runs the workflow for a rising edge and records the result.
    pub async fn execute(&self, machine: &MachineName) {
        let paths = MachinePaths::new(machine.clone());
        let machine_id = read_string(self.plane.as_ref(), &paths.config_machine_id())
            .await
            .map(MachineId::new)
            .unwrap_or_else(|| machine.machine_id());

        let outcome = self.run_workflow(machine, &paths).await;

        let exception_text = match &outcome {
            Ok(()) => String::new(),
            Err(e) => {
                if e.is_unexpected() {
                    self.write_crash_dump(&machine_id, e);
                }
                e.to_string()
            }
        };

        // Terminal completion regardless of outcome.
        if !self.plane.write(&paths.pm_stat(), PlaneValue::Bool(true)).await {
            warn!(machine = %machine, "Failed to write ProgramManagement.Stat");
        }
        if !self
            .plane
            .write(&paths.pm_exception(), PlaneValue::String(exception_text.clone()))
            .await
        {
            warn!(machine = %machine, "Failed to write ProgramManagement.Exception");
        }

        match outcome {
            Ok(()) => info!(machine = %machine, "Program selection complete"),
            Err(e) => warn!(machine = %machine, error = %e, "Program selection failed"),
        }
    }

    /// Handles the falling edge: `Stat := false`, nothing else.
    pub async fn acknowledge(&self, machine: &MachineName) {
        let paths = MachinePaths::new(machine.clone());
        if !self.plane.write(&paths.pm_stat(), PlaneValue::Bool(false)).await {
            warn!(machine = %machine, "Failed to clear ProgramManagement.Stat");
        }
    }

    async fn run_workflow(
        &self,
        machine: &MachineName,
        paths: &MachinePaths,
    ) -> ProgramResult<()> {
        let request = self.read_request(paths).await;
        info!(
            machine = %machine,
            filepath = %request.filepath,
            id = %request.id,
            main_file = %request.main_file,
            "Program-management workflow started"
        );

        let ip = read_string(self.plane.as_ref(), &paths.config_ip_address())
            .await
            .unwrap_or_else(|| "127.0.0.1".to_string());

        self.stage_file(&request, &ip)?;

        if request.main_file.trim().is_empty() {
            return Err(ProgramError::MissingMainFile);
        }

        let session = self.pool.acquire(machine).await?;
        let outcome = {
            let mut api = session.lock().await;
            api.select_main_program(&request.main_file, "", "", 0).await?
        };

        if !outcome.is_success() {
            return Err(ProgramError::command(outcome.result, &outcome.error_message));
        }

        Ok(())
    }

    async fn read_request(&self, paths: &MachinePaths) -> ProgramRequest {
        ProgramRequest {
            filepath: read_string(self.plane.as_ref(), &paths.pm_filepath())
                .await
                .unwrap_or_default(),
            id: read_string(self.plane.as_ref(), &paths.pm_id())
                .await
                .unwrap_or_default(),
            main_file: read_string(self.plane.as_ref(), &paths.pm_main_file())
                .await
                .unwrap_or_default(),
        }
    }

    /// Ensures the per-IP staging directory exists and copies the source
    /// file in with its original name. An empty `Filepath` skips the copy.
    fn stage_file(&self, request: &ProgramRequest, ip: &str) -> ProgramResult<()> {
        let staging_dir = self.staging_root.join(ip);
        std::fs::create_dir_all(&staging_dir)
            .map_err(|e| ProgramError::unexpected(format!("create staging directory: {}", e)))?;

        if request.filepath.trim().is_empty() {
            warn!("Filepath is empty, skipping program copy");
            return Ok(());
        }

        let source = Path::new(&request.filepath);
        if !source.exists() {
            return Err(ProgramError::source_missing(&request.filepath));
        }

        let file_name = source
            .file_name()
            .ok_or_else(|| ProgramError::unexpected(format!("no file name in '{}'", request.filepath)))?;
        let target = staging_dir.join(file_name);

        std::fs::copy(source, &target)
            .map_err(|e| ProgramError::unexpected(format!("copy to staging: {}", e)))?;

        info!(target = %target.display(), "Program staged");
        Ok(())
    }

    fn write_crash_dump(&self, machine_id: &MachineId, error: &ProgramError) {
        let name = format!(
            "Exception_{}_{}.txt",
            Local::now().format("%Y-%m-%d_%H-%M-%S"),
            machine_id
        );
        let path = self.dump_dir.join(name);
        let body = format!("{}\n", error);
        if let Err(e) = std::fs::write(&path, body) {
            warn!(path = %path.display(), error = %e, "Failed to write crash dump");
        } else {
            warn!(path = %path.display(), "Crash dump written");
        }
    }
}
