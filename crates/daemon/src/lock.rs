// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Singleton Lock (C1, spec §4.1): one exclusive pidfile per daemon role,
//! self-healing a stale lock left behind by a crash.
//!
//! Acquisition order matters: the file is opened without truncating and the
//! OS-level exclusive lock is taken *before* the PID is written, so a losing
//! racer never clobbers the winner's PID. Generalizes the ordering
//! `oj-daemon`'s lifecycle module uses for its own lock file.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub enum AcquireOutcome {
    Acquired(SingletonLock),
    AlreadyRunning { pid: u32 },
}

pub struct SingletonLock {
    file: File,
    path: PathBuf,
}

impl SingletonLock {
    /// `acquire(name) -> {acquired, pidFile, release?}` (spec §4.1).
    pub fn acquire(config_dir: &Path, name: &str) -> Result<AcquireOutcome, LockError> {
        Self::acquire_inner(config_dir, name, true)
    }

    fn acquire_inner(config_dir: &Path, name: &str, allow_retry: bool) -> Result<AcquireOutcome, LockError> {
        let path = crate::env::pid_path(config_dir, name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().write(true).read(true).create(true).truncate(false).open(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                file.set_len(0)?;
                file.seek(SeekFrom::Start(0))?;
                write!(file, "{}", std::process::id())?;
                file.flush()?;
                Ok(AcquireOutcome::Acquired(SingletonLock { file, path }))
            }
            Err(_) => {
                let mut contents = String::new();
                file.read_to_string(&mut contents).ok();
                let holder_pid = contents.trim().parse::<u32>().ok();

                match holder_pid {
                    Some(pid) if pid_is_alive(pid) => Ok(AcquireOutcome::AlreadyRunning { pid }),
                    _ if allow_retry => {
                        // Either the PID is dead or the contents are corrupt:
                        // a crash left this behind. Self-heal once.
                        drop(file);
                        std::fs::remove_file(&path).ok();
                        Self::acquire_inner(config_dir, name, false)
                    }
                    Some(pid) => Ok(AcquireOutcome::AlreadyRunning { pid }),
                    None => Ok(AcquireOutcome::AlreadyRunning { pid: 0 }),
                }
            }
        }
    }

    /// Unlinks the pidfile best-effort. The OS-level exclusive lock is
    /// released when `self.file` drops regardless.
    pub fn release(&self) {
        std::fs::remove_file(&self.path).ok();
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn pid_is_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    kill(Pid::from_raw(pid as i32), None).is_ok()
}
