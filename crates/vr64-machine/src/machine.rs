use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use vr64_cpu::{CpuState, DecodeError, HandlerCache, Interpreter, Ram, Step, GPR_COUNT, RESET_PC};
use vr64_image::{ImageKind, ProgramImage};
use vr64_snapshot::{
    Fingerprint, FramebufferState, SaveOptions, Snapshot, SnapshotError, SnapshotMeta,
    SnapshotSlots, SnapshotSource, SnapshotTarget, VectorState,
};
use vr64_vector::{Framebuffer, RenderSource, VectorUnit, FB_HEIGHT, FB_WIDTH, SCRATCH_WORDS};

use crate::cheats::{CheatList, CHEAT_REGISTER};
use crate::config::{ConfigError, MachineConfig};
use crate::error::MachineError;
use crate::input::{Action, ControllerConfig};
use crate::peer::{payload_value, PeerInput, PEER_REGISTER};

/// Stack pointer loaded for titles that get the title-screen boot preset.
pub const BOOT_STACK_POINTER: u32 = 0x8033_B400;
pub const REG_SP: usize = 29;
/// Register written by controller input.
pub const INPUT_REGISTER: usize = 5;

const BOOT_PRESET_TITLE: &str = "mario";
const BOOT_PRESET_COLOR: [u32; 3] = [0xFF, 0xA0, 0x00];

/// Result of one outer iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iteration {
    pub frame: u64,
    pub step: Result<Step, DecodeError>,
    pub render: RenderSource,
}

/// The complete emulated system: scalar core, vector unit, memory and the loaded image.
///
/// Not synchronized; share it through [`crate::Runtime`].
pub struct Machine {
    config: MachineConfig,
    image: Option<ProgramImage>,
    /// Title carried in by a restored snapshot when it differs from the image header.
    restored_title: Option<String>,
    interp: Interpreter,
    ram: Ram,
    vector: VectorUnit,
    frame_count: u64,
    cheats: CheatList,
    peer: Option<Box<dyn PeerInput>>,
    rng: StdRng,
    slots: SnapshotSlots,
}

impl Machine {
    pub fn new(config: MachineConfig) -> Result<Self, MachineError> {
        config.validate()?;
        let ram = Ram::new(config.ram_words).map_err(|err| ConfigError::RamWords(err.0))?;
        let mut vector = VectorUnit::new();
        vector.set_use_test_pattern(config.use_test_pattern);
        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            image: None,
            restored_title: None,
            interp: Interpreter::default(),
            ram,
            vector,
            frame_count: 0,
            cheats: CheatList::default(),
            peer: None,
            slots: SnapshotSlots::new(),
        })
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn controller(&self) -> &ControllerConfig {
        &self.config.controller
    }

    pub fn controller_mut(&mut self) -> &mut ControllerConfig {
        &mut self.config.controller
    }

    pub fn image(&self) -> Option<&ProgramImage> {
        self.image.as_ref()
    }

    /// The loaded image's title, or the title of the last restored snapshot.
    pub fn title(&self) -> Option<&str> {
        let image = self.image.as_ref()?;
        Some(self.restored_title.as_deref().unwrap_or(image.title()))
    }

    pub fn cpu(&self) -> &CpuState {
        &self.interp.cpu
    }

    pub fn pc(&self) -> u32 {
        self.interp.cpu.pc
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn vector(&self) -> &VectorUnit {
        &self.vector
    }

    pub fn vector_mut(&mut self) -> &mut VectorUnit {
        &mut self.vector
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        self.vector.framebuffer()
    }

    pub fn ram(&self) -> &Ram {
        &self.ram
    }

    pub fn ram_mut(&mut self) -> &mut Ram {
        &mut self.ram
    }

    pub fn cache(&self) -> &HandlerCache {
        self.interp.cache()
    }

    pub fn cheats(&self) -> &CheatList {
        &self.cheats
    }

    pub fn toggle_test_pattern(&mut self) -> bool {
        self.vector.toggle_test_pattern()
    }

    /// Installs a new image: PC back to reset, the handler cache cleared, boot registers seeded.
    /// Cartridges also clear main memory; disk images leave it as is. Other registers keep their
    /// values.
    pub fn load_image(&mut self, image: ProgramImage) {
        tracing::info!(
            title = image.title(),
            md5 = %image.md5_hex(),
            len = image.len(),
            "image installed"
        );
        if image.kind() != ImageKind::Disk {
            self.ram.clear();
        }
        self.image = Some(image);
        self.restored_title = None;
        self.interp.clear_cache();
        self.interp.cpu.pc = RESET_PC;
        self.seed_boot_registers();
    }

    pub fn load_image_file(&mut self, path: &Path) -> Result<(), MachineError> {
        let image = ProgramImage::load(path)?;
        self.load_image(image);
        Ok(())
    }

    pub fn load_disk_file(&mut self, path: &Path) -> Result<(), MachineError> {
        let image = ProgramImage::load_disk(path)?;
        self.load_image(image);
        Ok(())
    }

    /// Load-time seeding: the title preset for matching cartridges, random `v0..v2` otherwise.
    fn seed_boot_registers(&mut self) {
        let Some(kind) = self.image.as_ref().map(ProgramImage::kind) else {
            return;
        };
        let preset = kind != ImageKind::Disk && self.apply_boot_preset();
        if !preset {
            for index in 0..3 {
                let value = self.rng.gen_range(1..=255u32);
                self.vector.set_reg(index, value);
            }
        }
        tracing::debug!(
            preset,
            v0 = self.vector.reg(0),
            v1 = self.vector.reg(1),
            v2 = self.vector.reg(2),
            "boot registers seeded"
        );
    }

    /// Loads the stack pointer and seed colors when the title asks for them.
    fn apply_boot_preset(&mut self) -> bool {
        let matches = self
            .title()
            .is_some_and(|title| title.to_ascii_lowercase().contains(BOOT_PRESET_TITLE));
        if matches {
            self.interp.cpu.set_reg(REG_SP, BOOT_STACK_POINTER);
            for (index, value) in BOOT_PRESET_COLOR.into_iter().enumerate() {
                self.vector.set_reg(index, value);
            }
        }
        matches
    }

    /// Whether the PC still points inside the loaded image.
    pub fn can_continue(&self) -> bool {
        self.image
            .as_ref()
            .is_some_and(|image| (self.interp.cpu.pc as usize) < image.len())
    }

    /// One outer iteration: step, then cheats and peer input, then render.
    ///
    /// A failed step is logged and skipped (PC += 4); cheats and peer input are skipped with
    /// it, rendering is not.
    pub fn run_iteration(&mut self) -> Result<Iteration, MachineError> {
        let image = self.image.as_ref().ok_or(MachineError::NoImage)?;
        self.frame_count += 1;

        let step = self
            .interp
            .step(image.as_bytes(), &mut self.ram, &mut self.vector);
        match &step {
            Ok(_) => {
                let cpu = &mut self.interp.cpu;
                self.cheats
                    .roll(&mut self.rng, |value| cpu.set_reg(CHEAT_REGISTER, value));
                if let Some(payload) = self.peer.as_mut().and_then(|peer| peer.poll()) {
                    let value = payload_value(&payload);
                    tracing::debug!(len = payload.len(), value, "peer input");
                    self.interp.cpu.set_reg(PEER_REGISTER, value);
                }
            }
            Err(err) => {
                tracing::warn!(frame = self.frame_count, %err, "step skipped");
                self.interp.skip();
            }
        }

        let render = self.vector.render();
        Ok(Iteration {
            frame: self.frame_count,
            step,
            render,
        })
    }

    /// Frame counter to zero, PC to reset, peer channel closed.
    pub fn stop(&mut self) {
        self.frame_count = 0;
        self.interp.cpu.pc = RESET_PC;
        self.detach_peer();
    }

    /// Stops, then zeroes registers, vector registers, scratch and memory and clears the handler
    /// cache. Only the title preset is reapplied, so other titles come back with `v0..v2 = 0`.
    /// The frame is left as it was.
    pub fn reset_hard(&mut self) {
        self.stop();
        self.interp.cpu.clear_regs();
        self.interp.clear_cache();
        self.vector.reset();
        self.ram.clear();
        let preset = self.apply_boot_preset();
        tracing::info!(preset, "hard reset");
    }

    pub fn reset_soft(&mut self) {
        self.interp.cpu.pc = RESET_PC;
        tracing::info!("soft reset");
    }

    pub fn set_register(&mut self, index: usize, value: u32) -> Result<(), MachineError> {
        if index >= GPR_COUNT {
            return Err(MachineError::RegisterIndex { index });
        }
        self.interp.cpu.set_reg(index, value);
        Ok(())
    }

    /// Feeds a controller action into the input register and forwards its name to the peer.
    pub fn press(&mut self, action: Action) {
        let code = action.input_code();
        self.interp.cpu.set_reg(INPUT_REGISTER, code);
        if let Some(peer) = self.peer.as_mut() {
            peer.send(action.name().as_bytes());
        }
        tracing::debug!(action = action.name(), code, "input");
    }

    /// Presses whatever action `key` is bound to.
    pub fn key_event(&mut self, key: &str) -> Option<Action> {
        let action = self.config.controller.action_for_key(key)?;
        self.press(action);
        Some(action)
    }

    pub fn add_cheat(&mut self, code: &str) -> Result<(), MachineError> {
        self.cheats.add(code)?;
        Ok(())
    }

    pub fn remove_cheat(&mut self, code: &str) -> bool {
        self.cheats.remove(code)
    }

    pub fn attach_peer(&mut self, peer: Box<dyn PeerInput>) {
        self.peer = Some(peer);
        tracing::info!("peer attached");
    }

    pub fn detach_peer(&mut self) {
        if self.peer.take().is_some() {
            tracing::info!("peer closed");
        }
    }

    pub fn has_peer(&self) -> bool {
        self.peer.is_some()
    }

    fn require_image(&self) -> Result<&ProgramImage, MachineError> {
        self.image.as_ref().ok_or(MachineError::NoImage)
    }

    pub fn save_state(&mut self, slot: u8) -> Result<Fingerprint, MachineError> {
        self.require_image()?;
        let mut slots = std::mem::take(&mut self.slots);
        let result = slots.save(slot, &*self);
        self.slots = slots;
        Ok(result?)
    }

    /// Restores a slot. On any error the machine is unchanged.
    pub fn load_state(&mut self, slot: u8) -> Result<Fingerprint, MachineError> {
        self.require_image()?;
        let slots = std::mem::take(&mut self.slots);
        let result = slots.load(slot, &mut *self);
        self.slots = slots;
        Ok(result?)
    }

    pub fn snapshot(&self) -> Result<Snapshot, MachineError> {
        Ok(Snapshot::capture(self)?)
    }

    /// Replaces all snapshotted state. Validates shapes first, so a rejected snapshot leaves
    /// the machine unchanged.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<(), MachineError> {
        let fb = &snapshot.framebuffer;
        if fb.width as usize != FB_WIDTH || fb.height as usize != FB_HEIGHT {
            return Err(SnapshotError::Corrupt("framebuffer dimensions mismatch").into());
        }
        if snapshot.vector.scratch.len() != SCRATCH_WORDS {
            return Err(SnapshotError::Corrupt("scratch size mismatch").into());
        }
        snapshot.restore_into(self)?;
        Ok(())
    }

    pub fn save_snapshot_file(&self, path: &Path) -> Result<Fingerprint, MachineError> {
        self.require_image()?;
        let io_err = |source| MachineError::Io {
            path: path.to_path_buf(),
            source,
        };
        let snapshot = self.snapshot()?;
        let mut w = BufWriter::new(File::create(path).map_err(io_err)?);
        snapshot.encode(&mut w, SaveOptions::default())?;
        w.flush().map_err(io_err)?;
        let fingerprint = snapshot.fingerprint()?;
        tracing::info!(path = %path.display(), %fingerprint, "snapshot written");
        Ok(fingerprint)
    }

    /// Decodes the whole file before touching the machine.
    pub fn restore_snapshot_file(&mut self, path: &Path) -> Result<Fingerprint, MachineError> {
        self.require_image()?;
        let file = File::open(path).map_err(|source| MachineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot = Snapshot::decode(&mut BufReader::new(file), self.ram.len_bytes())?;
        self.restore(&snapshot)?;
        let fingerprint = snapshot.fingerprint()?;
        tracing::info!(path = %path.display(), %fingerprint, "snapshot restored");
        Ok(fingerprint)
    }
}

impl SnapshotSource for Machine {
    fn snapshot_meta(&self) -> SnapshotMeta {
        SnapshotMeta {
            frame_count: self.frame_count,
            title: self.title().unwrap_or_default().to_string(),
        }
    }

    fn cpu_state(&self) -> vr64_snapshot::CpuState {
        vr64_snapshot::CpuState {
            pc: self.interp.cpu.pc,
            gpr: *self.interp.cpu.regs(),
        }
    }

    fn vector_state(&self) -> VectorState {
        VectorState {
            regs: *self.vector.regs(),
            pc: self.vector.pc(),
            cycles: self.vector.cycles(),
            scratch: self.vector.scratch().to_vec(),
        }
    }

    fn framebuffer_state(&self) -> FramebufferState {
        FramebufferState {
            width: FB_WIDTH as u32,
            height: FB_HEIGHT as u32,
            pixels: self.vector.framebuffer().pixels().to_vec(),
        }
    }

    fn ram_len(&self) -> usize {
        self.ram.len_bytes()
    }

    fn read_ram(&self, offset: u64, buf: &mut [u8]) -> vr64_snapshot::Result<()> {
        let offset: usize = offset
            .try_into()
            .map_err(|_| SnapshotError::Corrupt("ram offset overflow"))?;
        if !self.ram.read_bytes(offset, buf) {
            return Err(SnapshotError::Corrupt("ram read out of bounds"));
        }
        Ok(())
    }
}

impl SnapshotTarget for Machine {
    fn restore_meta(&mut self, meta: SnapshotMeta) {
        let Some(image) = &self.image else {
            self.frame_count = meta.frame_count;
            return;
        };
        if image.title() == meta.title {
            self.restored_title = None;
        } else {
            tracing::warn!(
                snapshot = %meta.title,
                loaded = image.title(),
                "snapshot was taken with a different image"
            );
            self.restored_title = Some(meta.title);
        }
        self.frame_count = meta.frame_count;
    }

    fn restore_cpu_state(&mut self, state: vr64_snapshot::CpuState) {
        self.interp.cpu.pc = state.pc;
        self.interp.cpu.set_regs(state.gpr);
    }

    fn restore_vector_state(&mut self, state: VectorState) {
        self.vector.set_regs(state.regs);
        self.vector.set_pc(state.pc);
        self.vector.set_cycles(state.cycles);
        if !self.vector.load_scratch(&state.scratch) {
            tracing::warn!(len = state.scratch.len(), "ignoring scratch of unexpected size");
        }
    }

    fn restore_framebuffer_state(&mut self, state: FramebufferState) {
        if !self.vector.framebuffer_mut().copy_from(&state.pixels) {
            tracing::warn!(
                width = state.width,
                height = state.height,
                "ignoring framebuffer of unexpected size"
            );
        }
    }

    fn ram_len(&self) -> usize {
        self.ram.len_bytes()
    }

    fn write_ram(&mut self, offset: u64, data: &[u8]) -> vr64_snapshot::Result<()> {
        let offset: usize = offset
            .try_into()
            .map_err(|_| SnapshotError::Corrupt("ram offset overflow"))?;
        if !self.ram.write_bytes(offset, data) {
            return Err(SnapshotError::Corrupt("ram write out of bounds"));
        }
        Ok(())
    }
}
