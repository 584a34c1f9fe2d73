use crate::backends::decoder::{decoder_for, CallTarget, InsnClass, InstructionDecoder};
use crate::backends::reader::Arch;
use crate::image::Image;
use crate::model::{Address, FuncId, InstPoint, Instruction, ModuleId, PointKind};

#[derive(Debug, Default)]
struct Discovered {
    entry: Option<InstPoint>,
    returns: Vec<InstPoint>,
    calls: Vec<InstPoint>,
}

impl Image {
    /// Decoder for this image's architecture, honoring the config override.
    pub fn decoder(&self) -> Option<Box<dyn InstructionDecoder>> {
        let arch = match self.config.arch.as_deref() {
            Some(hint) => Arch::from_hint(hint),
            None => self.arch,
        };
        decoder_for(arch, self.little_endian)
    }

    /// Find entry, return and call points of one function. Runs at most once
    /// per function; a handle this image never issued is ignored.
    pub fn check_call_points(&mut self, id: FuncId) {
        let Some(func) = self.get_function(id) else { return };
        if func.points_checked {
            return;
        }
        match self.decoder() {
            Some(decoder) => self.check_call_points_with(id, decoder.as_ref()),
            None => {
                let addr = func.addr();
                log::warn!(
                    "no instruction decoder for {:?}; {} gets only a raw entry point",
                    self.arch,
                    func.sym_tab_name()
                );
                let bytes = self.code_bytes(addr, addr.saturating_add(4)).to_vec();
                let found = Discovered {
                    entry: (!bytes.is_empty())
                        .then(|| InstPoint::new(PointKind::Entry, id, Instruction::new(addr, bytes))),
                    ..Discovered::default()
                };
                self.store_points(id, found);
            }
        }
    }

    /// Same as `check_call_points`, with an explicit decoder.
    pub fn check_call_points_with(&mut self, id: FuncId, decoder: &dyn InstructionDecoder) {
        match self.get_function(id) {
            Some(func) if !func.points_checked => {}
            _ => return,
        }
        let found = self.discover(id, decoder);
        self.store_points(id, found);
    }

    /// Check call points of every function in one module that has not been
    /// checked yet.
    pub fn check_all_call_points(&mut self, module: ModuleId) {
        let Some(ids) = self.get_module(module).map(|m| m.functions.clone()) else { return };
        let decoder = self.decoder();
        for id in ids {
            match &decoder {
                Some(decoder) => self.check_call_points_with(id, decoder.as_ref()),
                None => self.check_call_points(id),
            }
        }
    }

    /// Check call points of every function in the image.
    pub fn check_all_functions(&mut self) {
        for index in 0..self.modules.len() {
            self.check_all_call_points(self.modules[index].id());
        }
    }

    fn store_points(&mut self, id: FuncId, found: Discovered) {
        let func = &mut self.functions[id.index()];
        func.entry = found.entry;
        func.returns = found.returns;
        func.calls = found.calls;
        func.points_checked = true;
    }

    /// End of the scan window: the next function, the declared size, or the
    /// end of the code segment, whichever comes first.
    fn scan_end(&self, id: FuncId) -> Address {
        let func = self.function(id);
        let mut end = self.space.code_offset().saturating_add(self.code.len() as u64);
        if let Some((next, _)) = self.funcs_by_addr.range(func.addr().saturating_add(1)..).next() {
            end = end.min(*next);
        }
        if func.size() > 0 {
            end = end.min(func.addr().saturating_add(func.size()));
        }
        end
    }

    /// The delay-slot (or aggregate) word at `addr`, if it is a valid address.
    fn word_at(&self, addr: Address, end: Address) -> Option<Instruction> {
        if addr >= end || !self.space.is_valid(addr) {
            return None;
        }
        let word = self.instruction_word(addr);
        let bytes = if self.little_endian { word.to_le_bytes() } else { word.to_be_bytes() };
        Some(Instruction::new(addr, bytes.to_vec()))
    }

    /// Walk the function's instructions and record its points. Nothing in the
    /// image is modified.
    fn discover(&self, id: FuncId, decoder: &dyn InstructionDecoder) -> Discovered {
        let mut found = Discovered::default();
        let start = self.function(id).addr();
        if !self.space.is_code(start) {
            log::debug!("{} is not in the code segment; no points", self.function(id).sym_tab_name());
            return found;
        }
        let end = self.scan_end(id);
        let bytes = self.code_bytes(start, end);
        let delays = decoder.has_delay_slots();

        let mut pos = 0usize;
        let mut prev_delayed = false;
        while pos < bytes.len() {
            let addr = start + pos as u64;
            let Some(insn) = decoder.decode(&bytes[pos..], addr) else {
                pos += 1;
                prev_delayed = false;
                continue;
            };
            let len = insn.len.max(1).min(bytes.len() - pos);
            let original = Instruction::new(addr, bytes[pos..pos + len].to_vec());
            let delayed = delays && insn.class.is_control_transfer();
            let slot_addr = addr + len as u64;
            let delay_slot = if delayed { self.word_at(slot_addr, end) } else { None };

            let point = |kind: PointKind| {
                let mut p = InstPoint::new(kind, id, original.clone());
                p.is_delayed = delayed;
                p.in_delay_slot = prev_delayed;
                p.delay_slot = delay_slot.clone();
                p
            };

            if found.entry.is_none() && insn.class != InsnClass::Prologue {
                found.entry = Some(point(PointKind::Entry));
            }

            match insn.class {
                InsnClass::Call(target) => {
                    let mut p = point(PointKind::Call);
                    match target {
                        CallTarget::Direct(dest) => {
                            p.callee = self.funcs_by_addr.get(&dest).copied();
                        }
                        CallTarget::Indirect | CallTarget::Unknown => p.call_indirect = true,
                    }
                    if delayed {
                        let agg_addr = slot_addr + 4;
                        if let Some(agg) = self.word_at(agg_addr, end) {
                            let marker = decoder
                                .decode(&agg.bytes, agg_addr)
                                .is_some_and(|d| d.class == InsnClass::AggregateMarker);
                            if marker {
                                p.call_aggregate = true;
                                p.aggregate = Some(agg);
                            }
                        }
                    }
                    found.calls.push(p);
                }
                InsnClass::Return => found.returns.push(point(PointKind::Return)),
                _ => {}
            }

            prev_delayed = delayed;
            pos += len;
        }
        found
    }
}
