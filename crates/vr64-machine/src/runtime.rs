use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use vr64_snapshot::Fingerprint;

use crate::config::{check_speed, ConfigError, MachineConfig};
use crate::error::MachineError;
use crate::input::Action;
use crate::machine::Machine;
use crate::peer::UdpPeer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
}

/// Sleep between iterations at `speed`.
pub fn frame_interval(speed: f64) -> Duration {
    Duration::from_secs_f64(1.0 / (60.0 * speed))
}

/// Drives a [`Machine`] on a worker thread.
///
/// Every operation takes the machine lock, so all of them are safe while running. Stopping is
/// cooperative: the worker finishes its current iteration before it sees the cleared flag.
pub struct Runtime {
    machine: Arc<Mutex<Machine>>,
    running: Arc<AtomicBool>,
    speed: Arc<AtomicU64>,
    worker: Option<JoinHandle<()>>,
}

impl Runtime {
    pub fn new(config: MachineConfig) -> Result<Self, MachineError> {
        let speed = config.speed;
        let machine = Machine::new(config)?;
        Ok(Self {
            machine: Arc::new(Mutex::new(machine)),
            running: Arc::new(AtomicBool::new(false)),
            speed: Arc::new(AtomicU64::new(speed.to_bits())),
            worker: None,
        })
    }

    pub fn machine(&self) -> Arc<Mutex<Machine>> {
        Arc::clone(&self.machine)
    }

    pub fn with_machine<R>(&self, f: impl FnOnce(&mut Machine) -> R) -> R {
        f(&mut lock(&self.machine))
    }

    pub fn state(&self) -> EngineState {
        if self.running.load(Ordering::SeqCst) {
            EngineState::Running
        } else {
            EngineState::Idle
        }
    }

    pub fn load_image(&self, path: &Path) -> Result<(), MachineError> {
        self.with_machine(|m| m.load_image_file(path))
    }

    pub fn load_disk(&self, path: &Path) -> Result<(), MachineError> {
        self.with_machine(|m| m.load_disk_file(path))
    }

    pub fn speed(&self) -> f64 {
        f64::from_bits(self.speed.load(Ordering::Relaxed))
    }

    /// Takes effect from the next iteration.
    pub fn set_speed(&self, speed: f64) -> Result<(), ConfigError> {
        check_speed(speed)?;
        self.speed.store(speed.to_bits(), Ordering::Relaxed);
        tracing::info!(speed, "speed set");
        Ok(())
    }

    /// Starts the worker. A no-op while already running.
    pub fn start(&mut self) -> Result<(), MachineError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }
        if lock(&self.machine).image().is_none() {
            return Err(MachineError::NoImage);
        }
        self.join_worker();

        self.running.store(true, Ordering::SeqCst);
        let machine = Arc::clone(&self.machine);
        let running = Arc::clone(&self.running);
        let speed = Arc::clone(&self.speed);
        let worker = std::thread::Builder::new()
            .name("vr64-worker".into())
            .spawn(move || run_worker(&machine, &running, &speed));
        match worker {
            Ok(handle) => {
                self.worker = Some(handle);
                tracing::info!("emulation started");
                Ok(())
            }
            Err(err) => {
                self.running.store(false, Ordering::SeqCst);
                Err(MachineError::Worker(err))
            }
        }
    }

    /// Clears the running flag and waits for the worker to finish its iteration.
    pub fn pause(&mut self) {
        if self.running.swap(false, Ordering::SeqCst) {
            tracing::info!("emulation paused");
        }
        self.join_worker();
    }

    /// Pauses, then zeroes the frame counter, resets the PC and closes the peer channel.
    /// Repeating it changes nothing further.
    pub fn stop(&mut self) {
        self.pause();
        lock(&self.machine).stop();
    }

    pub fn reset_hard(&mut self) {
        self.pause();
        lock(&self.machine).reset_hard();
    }

    pub fn reset_soft(&self) {
        lock(&self.machine).reset_soft();
    }

    pub fn set_register(&self, index: usize, value: u32) -> Result<(), MachineError> {
        lock(&self.machine).set_register(index, value)
    }

    /// Forwards controller input. Ignored (returns `false`) unless running.
    pub fn press(&self, action: Action) -> bool {
        if self.state() != EngineState::Running {
            return false;
        }
        lock(&self.machine).press(action);
        true
    }

    pub fn key_event(&self, key: &str) -> Option<Action> {
        if self.state() != EngineState::Running {
            return None;
        }
        lock(&self.machine).key_event(key)
    }

    pub fn add_cheat(&self, code: &str) -> Result<(), MachineError> {
        lock(&self.machine).add_cheat(code)
    }

    pub fn save_state(&self, slot: u8) -> Result<Fingerprint, MachineError> {
        lock(&self.machine).save_state(slot)
    }

    pub fn load_state(&self, slot: u8) -> Result<Fingerprint, MachineError> {
        lock(&self.machine).load_state(slot)
    }

    /// Hosts on the configured port when `host` is `None`, otherwise connects to it.
    pub fn enable_netplay(&self, host: Option<&str>) -> Result<(), MachineError> {
        let mut machine = lock(&self.machine);
        let port = machine.config().netplay_port;
        let peer = match host {
            None => UdpPeer::host(port),
            Some(host) => UdpPeer::connect((host, port)),
        }
        .map_err(MachineError::Netplay)?;
        machine.attach_peer(Box::new(peer));
        Ok(())
    }

    pub fn disable_netplay(&self) {
        lock(&self.machine).detach_peer();
    }

    fn join_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                tracing::error!("worker thread panicked");
            }
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.pause();
    }
}

fn lock(machine: &Mutex<Machine>) -> MutexGuard<'_, Machine> {
    machine.lock().unwrap_or_else(PoisonError::into_inner)
}

fn run_worker(machine: &Mutex<Machine>, running: &AtomicBool, speed: &AtomicU64) {
    while running.load(Ordering::SeqCst) {
        let more = {
            let mut machine = lock(machine);
            machine.can_continue()
                && match machine.run_iteration() {
                    Ok(_) => machine.can_continue(),
                    Err(err) => {
                        tracing::warn!(%err, "iteration failed");
                        false
                    }
                }
        };
        if !more {
            running.store(false, Ordering::SeqCst);
            tracing::info!("program counter left the image; emulation idle");
            break;
        }
        std::thread::sleep(frame_interval(f64::from_bits(speed.load(Ordering::Relaxed))));
    }
}
