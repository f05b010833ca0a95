use crate::csr::{self, CsrAccess};
use airisc_common::csr::{Csr, Interrupt, MCAUSE_INTERRUPT, Trap};
use core::mem;

/// Width of the instruction skipped when an exception handler resumes.
///
/// Compressed 16-bit instructions are not detected; resuming past one lands
/// in the middle of the next instruction. Firmware that resumes after
/// exceptions must be built without the C extension (`riscv32im`), since
/// `riscv32imac` code emits `c.ebreak` and other compressed forms.
pub const INSTRUCTION_WIDTH: u32 = 4;

/// Machine state captured once on trap entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapContext {
    /// Raw `mcause`.
    pub cause: u32,
    /// Raw `mepc`: the interrupted or faulting instruction.
    pub pc: u32,
    /// Raw `mtval`: faulting address or instruction bits, cause dependent.
    pub tval: u32,
}

impl TrapContext {
    pub fn capture<C: CsrAccess + ?Sized>(csrs: &C) -> Self {
        Self {
            cause: csrs.read(Csr::Mcause),
            pc: csrs.read(Csr::Mepc),
            tval: csrs.read(Csr::Mtval),
        }
    }

    pub const fn is_interrupt(&self) -> bool {
        self.cause & MCAUSE_INTERRUPT != 0
    }

    pub const fn trap(&self) -> Trap {
        Trap::decode(self.cause)
    }
}

/// What the trap vector does once the handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapAction {
    /// Return to the interrupted code. After an exception the faulting
    /// instruction is skipped.
    Resume,
    /// Return without adjusting `mepc`, re-executing the faulting
    /// instruction.
    Retry,
    /// Mask every interrupt source and park the hart.
    Halt,
}

/// Firmware hooks invoked by [`TrapDispatcher`].
///
/// Both methods have default bodies, so an implementation only overrides the
/// trap kinds it cares about.
pub trait TrapHandler {
    /// Called for every asynchronous trap.
    ///
    /// The default acknowledges all pending interrupts and resumes. Causes
    /// outside the known set mask every source and halt.
    fn on_interrupt(&mut self, ctx: TrapContext, csrs: &mut dyn CsrAccess) -> TrapAction {
        default_interrupt(ctx, csrs)
    }

    /// Called for every synchronous exception.
    ///
    /// The default logs the cause and halts.
    fn on_exception(&mut self, ctx: TrapContext, csrs: &mut dyn CsrAccess) -> TrapAction {
        default_exception(ctx, csrs)
    }
}

pub fn default_interrupt(ctx: TrapContext, csrs: &mut dyn CsrAccess) -> TrapAction {
    if let Trap::Interrupt(Interrupt::Unknown(code)) = ctx.trap() {
        log::error!("unknown interrupt {:#x} at pc {:#010x}", code, ctx.pc);
        if let Err(err) = csr::disable_all_interrupts(csrs) {
            log::error!("could not mask interrupts: {err:?}");
        }
        return TrapAction::Halt;
    }
    match csr::clear_all_pending(csrs) {
        Ok(()) => TrapAction::Resume,
        Err(_) => TrapAction::Halt,
    }
}

pub fn default_exception(ctx: TrapContext, _csrs: &mut dyn CsrAccess) -> TrapAction {
    let description = match ctx.trap() {
        Trap::Exception(Some(exception)) => exception.describe(),
        _ => "unknown exception",
    };
    log::error!(
        "{} (mcause {:#x}) at pc {:#010x}, mtval {:#010x}",
        description,
        ctx.cause,
        ctx.pc,
        ctx.tval
    );
    TrapAction::Halt
}

/// Handler set using only the default bodies.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHandlers;

impl TrapHandler for DefaultHandlers {}

/// Handler set built from two plain functions.
#[derive(Clone, Copy)]
pub struct FnHandlers {
    pub interrupt: fn(TrapContext, &mut dyn CsrAccess) -> TrapAction,
    pub exception: fn(TrapContext, &mut dyn CsrAccess) -> TrapAction,
}

impl FnHandlers {
    pub const DEFAULT: Self = Self {
        interrupt: default_interrupt,
        exception: default_exception,
    };
}

impl Default for FnHandlers {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TrapHandler for FnHandlers {
    fn on_interrupt(&mut self, ctx: TrapContext, csrs: &mut dyn CsrAccess) -> TrapAction {
        (self.interrupt)(ctx, csrs)
    }

    fn on_exception(&mut self, ctx: TrapContext, csrs: &mut dyn CsrAccess) -> TrapAction {
        (self.exception)(ctx, csrs)
    }
}

/// An empty slot behaves like [`DefaultHandlers`], so a dispatcher can live in
/// a `static` before the firmware installs its handler.
impl<H: TrapHandler> TrapHandler for Option<H> {
    fn on_interrupt(&mut self, ctx: TrapContext, csrs: &mut dyn CsrAccess) -> TrapAction {
        match self {
            Some(handler) => handler.on_interrupt(ctx, csrs),
            None => default_interrupt(ctx, csrs),
        }
    }

    fn on_exception(&mut self, ctx: TrapContext, csrs: &mut dyn CsrAccess) -> TrapAction {
        match self {
            Some(handler) => handler.on_exception(ctx, csrs),
            None => default_exception(ctx, csrs),
        }
    }
}

/// Routes each trap to the installed handler.
pub struct TrapDispatcher<H = DefaultHandlers> {
    handler: H,
}

impl<H: TrapHandler> TrapDispatcher<H> {
    pub const fn new(handler: H) -> Self {
        Self { handler }
    }

    /// Replaces the handler.
    ///
    /// # Returns
    ///
    /// The previously installed handler.
    pub fn install(&mut self, handler: H) -> H {
        mem::replace(&mut self.handler, handler)
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Handles the trap currently described by `mcause`, `mepc` and `mtval`.
    ///
    /// When an exception handler asks to resume, `mepc` is advanced by
    /// [`INSTRUCTION_WIDTH`] so `mret` skips the faulting instruction. If
    /// that write fails the trap is escalated to [`TrapAction::Halt`].
    pub fn dispatch<C: CsrAccess>(&mut self, csrs: &mut C) -> TrapAction {
        let ctx = TrapContext::capture(csrs);
        log::trace!("trap: mcause={:#010x} mepc={:#010x}", ctx.cause, ctx.pc);

        if ctx.is_interrupt() {
            return self.handler.on_interrupt(ctx, csrs);
        }

        let action = self.handler.on_exception(ctx, csrs);
        if action == TrapAction::Resume {
            let next = ctx.pc.wrapping_add(INSTRUCTION_WIDTH);
            if csrs.write(Csr::Mepc, next).is_err() {
                return TrapAction::Halt;
            }
        }
        action
    }
}
