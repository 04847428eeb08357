//! Foreign opcode forms and their decoding metadata (ECMA-335).
//!
//! This module defines [`Op`], the closed set of concrete stack-machine opcode forms the
//! backend can hand out, together with a finite per-opcode metadata table ([`OpInfo`]):
//! operand shape, control-flow class and fixed stack effect. Both codec directions are
//! driven by this table rather than by per-opcode branching logic, which keeps the
//! ~180-forms-to-canonical-kinds collapse and any unsupported gaps auditable in one place.
//!
//! Single-byte forms occupy `0x00`-`0xE0`; extended forms share the `0xFE` prefix byte.

use strum::{Display, IntoStaticStr};

/// Shared first byte of all extended opcode forms.
pub const EXTENDED_PREFIX: u8 = 0xFE;

/// Shape of the operand bytes that follow an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// No operand present
    None,
    /// Signed 8-bit immediate
    Int8,
    /// Unsigned 8-bit variable/argument index
    UInt8,
    /// Unsigned 16-bit variable/argument index
    UInt16,
    /// Signed 32-bit immediate
    Int32,
    /// Signed 64-bit immediate
    Int64,
    /// 32-bit floating point immediate
    Float32,
    /// 64-bit floating point immediate
    Float64,
    /// Metadata token
    Token,
    /// String literal (user-string heap entry, handed out pre-resolved)
    String,
    /// 8-bit branch displacement
    Target8,
    /// 32-bit branch displacement
    Target32,
    /// Switch table: 4-byte count followed by that many 4-byte displacements
    Switch,
}

impl OperandKind {
    /// Returns the size in bytes of this operand shape.
    ///
    /// Returns `None` for [`OperandKind::Switch`], whose size depends on the target count.
    #[must_use]
    pub const fn size(&self) -> Option<usize> {
        match self {
            OperandKind::None => Some(0),
            OperandKind::Int8 | OperandKind::UInt8 | OperandKind::Target8 => Some(1),
            OperandKind::UInt16 => Some(2),
            OperandKind::Int32
            | OperandKind::Float32
            | OperandKind::Token
            | OperandKind::String
            | OperandKind::Target32 => Some(4),
            OperandKind::Int64 | OperandKind::Float64 => Some(8),
            OperandKind::Switch => None,
        }
    }
}

/// How an opcode affects control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    /// Execution continues with the next instruction
    Sequential,
    /// Conditional transfer to the operand target
    ConditionalBranch,
    /// Unconditional transfer to the operand target
    UnconditionalBranch,
    /// Method invocation, control returns after the call
    Call,
    /// Return from the current method
    Return,
    /// Multi-way transfer through the switch table
    Switch,
    /// Raises an exception
    Throw,
    /// Terminates a finally/filter region
    EndRegion,
    /// Exits a protected region towards the operand target
    Leave,
    /// Prefix modifying the following instruction
    Meta,
}

/// Fixed stack effect of an opcode.
///
/// Opcodes whose effect depends on a signature (calls, `ret`) carry no fixed behavior
/// in the table and are resolved against the involved symbol instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackBehavior {
    /// Number of items popped from the operand stack
    pub pops: u8,
    /// Number of items pushed onto the operand stack
    pub pushes: u8,
}

/// Static decoding metadata for one opcode form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpInfo {
    /// Operand shape following the opcode bytes
    pub operand: OperandKind,
    /// Control-flow classification
    pub flow: FlowKind,
    /// Fixed stack effect; `None` when signature-dependent
    pub stack: Option<StackBehavior>,
}

const fn fixed(operand: OperandKind, flow: FlowKind, pops: u8, pushes: u8) -> OpInfo {
    OpInfo {
        operand,
        flow,
        stack: Some(StackBehavior { pops, pushes }),
    }
}

const fn dynamic(operand: OperandKind, flow: FlowKind) -> OpInfo {
    OpInfo {
        operand,
        flow,
        stack: None,
    }
}

/// One concrete foreign opcode form.
///
/// Every form the instruction stream can carry is listed, including all implicit-operand
/// shorthand variants; the codec normalizes those onto canonical kinds with explicit
/// operands. The mnemonic is available through [`Op::mnemonic`] or `Display`.
///
/// # Examples
///
/// ```rust
/// use cilbridge::backend::{FlowKind, Op};
///
/// assert_eq!(Op::LdcI4S.mnemonic(), "ldc.i4.s");
/// assert_eq!(Op::BrS.info().flow, FlowKind::UnconditionalBranch);
/// assert_eq!(Op::Ceq.encoding(), (Some(0xFE), 0x01));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[allow(missing_docs)]
pub enum Op {
    // ── Single-byte forms ──────────────────────────────────────────────────
    #[strum(serialize = "nop")]
    Nop,
    #[strum(serialize = "break")]
    Break,
    #[strum(serialize = "ldarg.0")]
    Ldarg0,
    #[strum(serialize = "ldarg.1")]
    Ldarg1,
    #[strum(serialize = "ldarg.2")]
    Ldarg2,
    #[strum(serialize = "ldarg.3")]
    Ldarg3,
    #[strum(serialize = "ldloc.0")]
    Ldloc0,
    #[strum(serialize = "ldloc.1")]
    Ldloc1,
    #[strum(serialize = "ldloc.2")]
    Ldloc2,
    #[strum(serialize = "ldloc.3")]
    Ldloc3,
    #[strum(serialize = "stloc.0")]
    Stloc0,
    #[strum(serialize = "stloc.1")]
    Stloc1,
    #[strum(serialize = "stloc.2")]
    Stloc2,
    #[strum(serialize = "stloc.3")]
    Stloc3,
    #[strum(serialize = "ldarg.s")]
    LdargS,
    #[strum(serialize = "ldarga.s")]
    LdargaS,
    #[strum(serialize = "starg.s")]
    StargS,
    #[strum(serialize = "ldloc.s")]
    LdlocS,
    #[strum(serialize = "ldloca.s")]
    LdlocaS,
    #[strum(serialize = "stloc.s")]
    StlocS,
    #[strum(serialize = "ldnull")]
    Ldnull,
    #[strum(serialize = "ldc.i4.m1")]
    LdcI4M1,
    #[strum(serialize = "ldc.i4.0")]
    LdcI40,
    #[strum(serialize = "ldc.i4.1")]
    LdcI41,
    #[strum(serialize = "ldc.i4.2")]
    LdcI42,
    #[strum(serialize = "ldc.i4.3")]
    LdcI43,
    #[strum(serialize = "ldc.i4.4")]
    LdcI44,
    #[strum(serialize = "ldc.i4.5")]
    LdcI45,
    #[strum(serialize = "ldc.i4.6")]
    LdcI46,
    #[strum(serialize = "ldc.i4.7")]
    LdcI47,
    #[strum(serialize = "ldc.i4.8")]
    LdcI48,
    #[strum(serialize = "ldc.i4.s")]
    LdcI4S,
    #[strum(serialize = "ldc.i4")]
    LdcI4,
    #[strum(serialize = "ldc.i8")]
    LdcI8,
    #[strum(serialize = "ldc.r4")]
    LdcR4,
    #[strum(serialize = "ldc.r8")]
    LdcR8,
    #[strum(serialize = "dup")]
    Dup,
    #[strum(serialize = "pop")]
    Pop,
    #[strum(serialize = "jmp")]
    Jmp,
    #[strum(serialize = "call")]
    Call,
    #[strum(serialize = "calli")]
    Calli,
    #[strum(serialize = "ret")]
    Ret,
    #[strum(serialize = "br.s")]
    BrS,
    #[strum(serialize = "brfalse.s")]
    BrfalseS,
    #[strum(serialize = "brtrue.s")]
    BrtrueS,
    #[strum(serialize = "beq.s")]
    BeqS,
    #[strum(serialize = "bge.s")]
    BgeS,
    #[strum(serialize = "bgt.s")]
    BgtS,
    #[strum(serialize = "ble.s")]
    BleS,
    #[strum(serialize = "blt.s")]
    BltS,
    #[strum(serialize = "bne.un.s")]
    BneUnS,
    #[strum(serialize = "bge.un.s")]
    BgeUnS,
    #[strum(serialize = "bgt.un.s")]
    BgtUnS,
    #[strum(serialize = "ble.un.s")]
    BleUnS,
    #[strum(serialize = "blt.un.s")]
    BltUnS,
    #[strum(serialize = "br")]
    Br,
    #[strum(serialize = "brfalse")]
    Brfalse,
    #[strum(serialize = "brtrue")]
    Brtrue,
    #[strum(serialize = "beq")]
    Beq,
    #[strum(serialize = "bge")]
    Bge,
    #[strum(serialize = "bgt")]
    Bgt,
    #[strum(serialize = "ble")]
    Ble,
    #[strum(serialize = "blt")]
    Blt,
    #[strum(serialize = "bne.un")]
    BneUn,
    #[strum(serialize = "bge.un")]
    BgeUn,
    #[strum(serialize = "bgt.un")]
    BgtUn,
    #[strum(serialize = "ble.un")]
    BleUn,
    #[strum(serialize = "blt.un")]
    BltUn,
    #[strum(serialize = "switch")]
    Switch,
    #[strum(serialize = "ldind.i1")]
    LdindI1,
    #[strum(serialize = "ldind.u1")]
    LdindU1,
    #[strum(serialize = "ldind.i2")]
    LdindI2,
    #[strum(serialize = "ldind.u2")]
    LdindU2,
    #[strum(serialize = "ldind.i4")]
    LdindI4,
    #[strum(serialize = "ldind.u4")]
    LdindU4,
    #[strum(serialize = "ldind.i8")]
    LdindI8,
    #[strum(serialize = "ldind.i")]
    LdindI,
    #[strum(serialize = "ldind.r4")]
    LdindR4,
    #[strum(serialize = "ldind.r8")]
    LdindR8,
    #[strum(serialize = "ldind.ref")]
    LdindRef,
    #[strum(serialize = "stind.ref")]
    StindRef,
    #[strum(serialize = "stind.i1")]
    StindI1,
    #[strum(serialize = "stind.i2")]
    StindI2,
    #[strum(serialize = "stind.i4")]
    StindI4,
    #[strum(serialize = "stind.i8")]
    StindI8,
    #[strum(serialize = "stind.r4")]
    StindR4,
    #[strum(serialize = "stind.r8")]
    StindR8,
    #[strum(serialize = "add")]
    Add,
    #[strum(serialize = "sub")]
    Sub,
    #[strum(serialize = "mul")]
    Mul,
    #[strum(serialize = "div")]
    Div,
    #[strum(serialize = "div.un")]
    DivUn,
    #[strum(serialize = "rem")]
    Rem,
    #[strum(serialize = "rem.un")]
    RemUn,
    #[strum(serialize = "and")]
    And,
    #[strum(serialize = "or")]
    Or,
    #[strum(serialize = "xor")]
    Xor,
    #[strum(serialize = "shl")]
    Shl,
    #[strum(serialize = "shr")]
    Shr,
    #[strum(serialize = "shr.un")]
    ShrUn,
    #[strum(serialize = "neg")]
    Neg,
    #[strum(serialize = "not")]
    Not,
    #[strum(serialize = "conv.i1")]
    ConvI1,
    #[strum(serialize = "conv.i2")]
    ConvI2,
    #[strum(serialize = "conv.i4")]
    ConvI4,
    #[strum(serialize = "conv.i8")]
    ConvI8,
    #[strum(serialize = "conv.r4")]
    ConvR4,
    #[strum(serialize = "conv.r8")]
    ConvR8,
    #[strum(serialize = "conv.u4")]
    ConvU4,
    #[strum(serialize = "conv.u8")]
    ConvU8,
    #[strum(serialize = "callvirt")]
    Callvirt,
    #[strum(serialize = "cpobj")]
    Cpobj,
    #[strum(serialize = "ldobj")]
    Ldobj,
    #[strum(serialize = "ldstr")]
    Ldstr,
    #[strum(serialize = "newobj")]
    Newobj,
    #[strum(serialize = "castclass")]
    Castclass,
    #[strum(serialize = "isinst")]
    Isinst,
    #[strum(serialize = "conv.r.un")]
    ConvRUn,
    #[strum(serialize = "unbox")]
    Unbox,
    #[strum(serialize = "throw")]
    Throw,
    #[strum(serialize = "ldfld")]
    Ldfld,
    #[strum(serialize = "ldflda")]
    Ldflda,
    #[strum(serialize = "stfld")]
    Stfld,
    #[strum(serialize = "ldsfld")]
    Ldsfld,
    #[strum(serialize = "ldsflda")]
    Ldsflda,
    #[strum(serialize = "stsfld")]
    Stsfld,
    #[strum(serialize = "stobj")]
    Stobj,
    #[strum(serialize = "conv.ovf.i1.un")]
    ConvOvfI1Un,
    #[strum(serialize = "conv.ovf.i2.un")]
    ConvOvfI2Un,
    #[strum(serialize = "conv.ovf.i4.un")]
    ConvOvfI4Un,
    #[strum(serialize = "conv.ovf.i8.un")]
    ConvOvfI8Un,
    #[strum(serialize = "conv.ovf.u1.un")]
    ConvOvfU1Un,
    #[strum(serialize = "conv.ovf.u2.un")]
    ConvOvfU2Un,
    #[strum(serialize = "conv.ovf.u4.un")]
    ConvOvfU4Un,
    #[strum(serialize = "conv.ovf.u8.un")]
    ConvOvfU8Un,
    #[strum(serialize = "conv.ovf.i.un")]
    ConvOvfIUn,
    #[strum(serialize = "conv.ovf.u.un")]
    ConvOvfUUn,
    #[strum(serialize = "box")]
    Box,
    #[strum(serialize = "newarr")]
    Newarr,
    #[strum(serialize = "ldlen")]
    Ldlen,
    #[strum(serialize = "ldelema")]
    Ldelema,
    #[strum(serialize = "ldelem.i1")]
    LdelemI1,
    #[strum(serialize = "ldelem.u1")]
    LdelemU1,
    #[strum(serialize = "ldelem.i2")]
    LdelemI2,
    #[strum(serialize = "ldelem.u2")]
    LdelemU2,
    #[strum(serialize = "ldelem.i4")]
    LdelemI4,
    #[strum(serialize = "ldelem.u4")]
    LdelemU4,
    #[strum(serialize = "ldelem.i8")]
    LdelemI8,
    #[strum(serialize = "ldelem.i")]
    LdelemI,
    #[strum(serialize = "ldelem.r4")]
    LdelemR4,
    #[strum(serialize = "ldelem.r8")]
    LdelemR8,
    #[strum(serialize = "ldelem.ref")]
    LdelemRef,
    #[strum(serialize = "stelem.i")]
    StelemI,
    #[strum(serialize = "stelem.i1")]
    StelemI1,
    #[strum(serialize = "stelem.i2")]
    StelemI2,
    #[strum(serialize = "stelem.i4")]
    StelemI4,
    #[strum(serialize = "stelem.i8")]
    StelemI8,
    #[strum(serialize = "stelem.r4")]
    StelemR4,
    #[strum(serialize = "stelem.r8")]
    StelemR8,
    #[strum(serialize = "stelem.ref")]
    StelemRef,
    #[strum(serialize = "ldelem")]
    Ldelem,
    #[strum(serialize = "stelem")]
    Stelem,
    #[strum(serialize = "unbox.any")]
    UnboxAny,
    #[strum(serialize = "conv.ovf.i1")]
    ConvOvfI1,
    #[strum(serialize = "conv.ovf.u1")]
    ConvOvfU1,
    #[strum(serialize = "conv.ovf.i2")]
    ConvOvfI2,
    #[strum(serialize = "conv.ovf.u2")]
    ConvOvfU2,
    #[strum(serialize = "conv.ovf.i4")]
    ConvOvfI4,
    #[strum(serialize = "conv.ovf.u4")]
    ConvOvfU4,
    #[strum(serialize = "conv.ovf.i8")]
    ConvOvfI8,
    #[strum(serialize = "conv.ovf.u8")]
    ConvOvfU8,
    #[strum(serialize = "refanyval")]
    Refanyval,
    #[strum(serialize = "ckfinite")]
    Ckfinite,
    #[strum(serialize = "mkrefany")]
    Mkrefany,
    #[strum(serialize = "ldtoken")]
    Ldtoken,
    #[strum(serialize = "conv.u2")]
    ConvU2,
    #[strum(serialize = "conv.u1")]
    ConvU1,
    #[strum(serialize = "conv.i")]
    ConvI,
    #[strum(serialize = "conv.ovf.i")]
    ConvOvfI,
    #[strum(serialize = "conv.ovf.u")]
    ConvOvfU,
    #[strum(serialize = "add.ovf")]
    AddOvf,
    #[strum(serialize = "add.ovf.un")]
    AddOvfUn,
    #[strum(serialize = "mul.ovf")]
    MulOvf,
    #[strum(serialize = "mul.ovf.un")]
    MulOvfUn,
    #[strum(serialize = "sub.ovf")]
    SubOvf,
    #[strum(serialize = "sub.ovf.un")]
    SubOvfUn,
    #[strum(serialize = "endfinally")]
    Endfinally,
    #[strum(serialize = "leave")]
    Leave,
    #[strum(serialize = "leave.s")]
    LeaveS,
    #[strum(serialize = "stind.i")]
    StindI,
    #[strum(serialize = "conv.u")]
    ConvU,

    // ── Extended forms (0xFE prefix) ───────────────────────────────────────
    #[strum(serialize = "arglist")]
    Arglist,
    #[strum(serialize = "ceq")]
    Ceq,
    #[strum(serialize = "cgt")]
    Cgt,
    #[strum(serialize = "cgt.un")]
    CgtUn,
    #[strum(serialize = "clt")]
    Clt,
    #[strum(serialize = "clt.un")]
    CltUn,
    #[strum(serialize = "ldftn")]
    Ldftn,
    #[strum(serialize = "ldvirtftn")]
    Ldvirtftn,
    #[strum(serialize = "ldarg")]
    Ldarg,
    #[strum(serialize = "ldarga")]
    Ldarga,
    #[strum(serialize = "starg")]
    Starg,
    #[strum(serialize = "ldloc")]
    Ldloc,
    #[strum(serialize = "ldloca")]
    Ldloca,
    #[strum(serialize = "stloc")]
    Stloc,
    #[strum(serialize = "localloc")]
    Localloc,
    #[strum(serialize = "endfilter")]
    Endfilter,
    #[strum(serialize = "unaligned.")]
    UnalignedPrefix,
    #[strum(serialize = "volatile.")]
    VolatilePrefix,
    #[strum(serialize = "tail.")]
    TailPrefix,
    #[strum(serialize = "initobj")]
    Initobj,
    #[strum(serialize = "constrained.")]
    ConstrainedPrefix,
    #[strum(serialize = "cpblk")]
    Cpblk,
    #[strum(serialize = "initblk")]
    Initblk,
    #[strum(serialize = "rethrow")]
    Rethrow,
    #[strum(serialize = "sizeof")]
    Sizeof,
    #[strum(serialize = "refanytype")]
    Refanytype,
    #[strum(serialize = "readonly.")]
    ReadonlyPrefix,
}

impl Op {
    /// Returns the instruction mnemonic as a static string.
    #[must_use]
    pub fn mnemonic(&self) -> &'static str {
        self.into()
    }

    /// Returns the `(prefix, code)` byte encoding of this form.
    #[must_use]
    pub const fn encoding(self) -> (Option<u8>, u8) {
        use Op::*;
        let (prefixed, code): (bool, u8) = match self {
            Nop => (false, 0x00),
            Break => (false, 0x01),
            Ldarg0 => (false, 0x02),
            Ldarg1 => (false, 0x03),
            Ldarg2 => (false, 0x04),
            Ldarg3 => (false, 0x05),
            Ldloc0 => (false, 0x06),
            Ldloc1 => (false, 0x07),
            Ldloc2 => (false, 0x08),
            Ldloc3 => (false, 0x09),
            Stloc0 => (false, 0x0A),
            Stloc1 => (false, 0x0B),
            Stloc2 => (false, 0x0C),
            Stloc3 => (false, 0x0D),
            LdargS => (false, 0x0E),
            LdargaS => (false, 0x0F),
            StargS => (false, 0x10),
            LdlocS => (false, 0x11),
            LdlocaS => (false, 0x12),
            StlocS => (false, 0x13),
            Ldnull => (false, 0x14),
            LdcI4M1 => (false, 0x15),
            LdcI40 => (false, 0x16),
            LdcI41 => (false, 0x17),
            LdcI42 => (false, 0x18),
            LdcI43 => (false, 0x19),
            LdcI44 => (false, 0x1A),
            LdcI45 => (false, 0x1B),
            LdcI46 => (false, 0x1C),
            LdcI47 => (false, 0x1D),
            LdcI48 => (false, 0x1E),
            LdcI4S => (false, 0x1F),
            LdcI4 => (false, 0x20),
            LdcI8 => (false, 0x21),
            LdcR4 => (false, 0x22),
            LdcR8 => (false, 0x23),
            Dup => (false, 0x25),
            Pop => (false, 0x26),
            Jmp => (false, 0x27),
            Call => (false, 0x28),
            Calli => (false, 0x29),
            Ret => (false, 0x2A),
            BrS => (false, 0x2B),
            BrfalseS => (false, 0x2C),
            BrtrueS => (false, 0x2D),
            BeqS => (false, 0x2E),
            BgeS => (false, 0x2F),
            BgtS => (false, 0x30),
            BleS => (false, 0x31),
            BltS => (false, 0x32),
            BneUnS => (false, 0x33),
            BgeUnS => (false, 0x34),
            BgtUnS => (false, 0x35),
            BleUnS => (false, 0x36),
            BltUnS => (false, 0x37),
            Br => (false, 0x38),
            Brfalse => (false, 0x39),
            Brtrue => (false, 0x3A),
            Beq => (false, 0x3B),
            Bge => (false, 0x3C),
            Bgt => (false, 0x3D),
            Ble => (false, 0x3E),
            Blt => (false, 0x3F),
            BneUn => (false, 0x40),
            BgeUn => (false, 0x41),
            BgtUn => (false, 0x42),
            BleUn => (false, 0x43),
            BltUn => (false, 0x44),
            Switch => (false, 0x45),
            LdindI1 => (false, 0x46),
            LdindU1 => (false, 0x47),
            LdindI2 => (false, 0x48),
            LdindU2 => (false, 0x49),
            LdindI4 => (false, 0x4A),
            LdindU4 => (false, 0x4B),
            LdindI8 => (false, 0x4C),
            LdindI => (false, 0x4D),
            LdindR4 => (false, 0x4E),
            LdindR8 => (false, 0x4F),
            LdindRef => (false, 0x50),
            StindRef => (false, 0x51),
            StindI1 => (false, 0x52),
            StindI2 => (false, 0x53),
            StindI4 => (false, 0x54),
            StindI8 => (false, 0x55),
            StindR4 => (false, 0x56),
            StindR8 => (false, 0x57),
            Add => (false, 0x58),
            Sub => (false, 0x59),
            Mul => (false, 0x5A),
            Div => (false, 0x5B),
            DivUn => (false, 0x5C),
            Rem => (false, 0x5D),
            RemUn => (false, 0x5E),
            And => (false, 0x5F),
            Or => (false, 0x60),
            Xor => (false, 0x61),
            Shl => (false, 0x62),
            Shr => (false, 0x63),
            ShrUn => (false, 0x64),
            Neg => (false, 0x65),
            Not => (false, 0x66),
            ConvI1 => (false, 0x67),
            ConvI2 => (false, 0x68),
            ConvI4 => (false, 0x69),
            ConvI8 => (false, 0x6A),
            ConvR4 => (false, 0x6B),
            ConvR8 => (false, 0x6C),
            ConvU4 => (false, 0x6D),
            ConvU8 => (false, 0x6E),
            Callvirt => (false, 0x6F),
            Cpobj => (false, 0x70),
            Ldobj => (false, 0x71),
            Ldstr => (false, 0x72),
            Newobj => (false, 0x73),
            Castclass => (false, 0x74),
            Isinst => (false, 0x75),
            ConvRUn => (false, 0x76),
            Unbox => (false, 0x79),
            Throw => (false, 0x7A),
            Ldfld => (false, 0x7B),
            Ldflda => (false, 0x7C),
            Stfld => (false, 0x7D),
            Ldsfld => (false, 0x7E),
            Ldsflda => (false, 0x7F),
            Stsfld => (false, 0x80),
            Stobj => (false, 0x81),
            ConvOvfI1Un => (false, 0x82),
            ConvOvfI2Un => (false, 0x83),
            ConvOvfI4Un => (false, 0x84),
            ConvOvfI8Un => (false, 0x85),
            ConvOvfU1Un => (false, 0x86),
            ConvOvfU2Un => (false, 0x87),
            ConvOvfU4Un => (false, 0x88),
            ConvOvfU8Un => (false, 0x89),
            ConvOvfIUn => (false, 0x8A),
            ConvOvfUUn => (false, 0x8B),
            Box => (false, 0x8C),
            Newarr => (false, 0x8D),
            Ldlen => (false, 0x8E),
            Ldelema => (false, 0x8F),
            LdelemI1 => (false, 0x90),
            LdelemU1 => (false, 0x91),
            LdelemI2 => (false, 0x92),
            LdelemU2 => (false, 0x93),
            LdelemI4 => (false, 0x94),
            LdelemU4 => (false, 0x95),
            LdelemI8 => (false, 0x96),
            LdelemI => (false, 0x97),
            LdelemR4 => (false, 0x98),
            LdelemR8 => (false, 0x99),
            LdelemRef => (false, 0x9A),
            StelemI => (false, 0x9B),
            StelemI1 => (false, 0x9C),
            StelemI2 => (false, 0x9D),
            StelemI4 => (false, 0x9E),
            StelemI8 => (false, 0x9F),
            StelemR4 => (false, 0xA0),
            StelemR8 => (false, 0xA1),
            StelemRef => (false, 0xA2),
            Ldelem => (false, 0xA3),
            Stelem => (false, 0xA4),
            UnboxAny => (false, 0xA5),
            ConvOvfI1 => (false, 0xB3),
            ConvOvfU1 => (false, 0xB4),
            ConvOvfI2 => (false, 0xB5),
            ConvOvfU2 => (false, 0xB6),
            ConvOvfI4 => (false, 0xB7),
            ConvOvfU4 => (false, 0xB8),
            ConvOvfI8 => (false, 0xB9),
            ConvOvfU8 => (false, 0xBA),
            Refanyval => (false, 0xC2),
            Ckfinite => (false, 0xC3),
            Mkrefany => (false, 0xC6),
            Ldtoken => (false, 0xD0),
            ConvU2 => (false, 0xD1),
            ConvU1 => (false, 0xD2),
            ConvI => (false, 0xD3),
            ConvOvfI => (false, 0xD4),
            ConvOvfU => (false, 0xD5),
            AddOvf => (false, 0xD6),
            AddOvfUn => (false, 0xD7),
            MulOvf => (false, 0xD8),
            MulOvfUn => (false, 0xD9),
            SubOvf => (false, 0xDA),
            SubOvfUn => (false, 0xDB),
            Endfinally => (false, 0xDC),
            Leave => (false, 0xDD),
            LeaveS => (false, 0xDE),
            StindI => (false, 0xDF),
            ConvU => (false, 0xE0),
            Arglist => (true, 0x00),
            Ceq => (true, 0x01),
            Cgt => (true, 0x02),
            CgtUn => (true, 0x03),
            Clt => (true, 0x04),
            CltUn => (true, 0x05),
            Ldftn => (true, 0x06),
            Ldvirtftn => (true, 0x07),
            Ldarg => (true, 0x09),
            Ldarga => (true, 0x0A),
            Starg => (true, 0x0B),
            Ldloc => (true, 0x0C),
            Ldloca => (true, 0x0D),
            Stloc => (true, 0x0E),
            Localloc => (true, 0x0F),
            Endfilter => (true, 0x11),
            UnalignedPrefix => (true, 0x12),
            VolatilePrefix => (true, 0x13),
            TailPrefix => (true, 0x14),
            Initobj => (true, 0x15),
            ConstrainedPrefix => (true, 0x16),
            Cpblk => (true, 0x17),
            Initblk => (true, 0x18),
            Rethrow => (true, 0x1A),
            Sizeof => (true, 0x1C),
            Refanytype => (true, 0x1E),
            ReadonlyPrefix => (true, 0x1F),
        };
        if prefixed {
            (Some(EXTENDED_PREFIX), code)
        } else {
            (None, code)
        }
    }

    /// Returns the size in bytes of the opcode itself (1 or 2).
    #[must_use]
    pub const fn opcode_size(self) -> usize {
        match self.encoding() {
            (Some(_), _) => 2,
            (None, _) => 1,
        }
    }

    /// Returns the static decoding metadata for this form.
    #[must_use]
    pub const fn info(self) -> OpInfo {
        use FlowKind::*;
        use Op::*;
        use OperandKind as Shape;
        match self {
            Nop | Break => fixed(Shape::None, Sequential, 0, 0),
            Ldarg0 | Ldarg1 | Ldarg2 | Ldarg3 => fixed(Shape::None, Sequential, 0, 1),
            Ldloc0 | Ldloc1 | Ldloc2 | Ldloc3 => fixed(Shape::None, Sequential, 0, 1),
            Stloc0 | Stloc1 | Stloc2 | Stloc3 => fixed(Shape::None, Sequential, 1, 0),
            LdargS | LdargaS | LdlocS | LdlocaS => fixed(Shape::UInt8, Sequential, 0, 1),
            StargS | StlocS => fixed(Shape::UInt8, Sequential, 1, 0),
            Ldnull => fixed(Shape::None, Sequential, 0, 1),
            LdcI4M1 | LdcI40 | LdcI41 | LdcI42 | LdcI43 | LdcI44 | LdcI45 | LdcI46 | LdcI47
            | LdcI48 => fixed(Shape::None, Sequential, 0, 1),
            LdcI4S => fixed(Shape::Int8, Sequential, 0, 1),
            LdcI4 => fixed(Shape::Int32, Sequential, 0, 1),
            LdcI8 => fixed(Shape::Int64, Sequential, 0, 1),
            LdcR4 => fixed(Shape::Float32, Sequential, 0, 1),
            LdcR8 => fixed(Shape::Float64, Sequential, 0, 1),
            Dup => fixed(Shape::None, Sequential, 1, 2),
            Pop => fixed(Shape::None, Sequential, 1, 0),
            Jmp | Op::Call | Callvirt | Newobj => dynamic(Shape::Token, FlowKind::Call),
            Calli => dynamic(Shape::Token, FlowKind::Call),
            Ret => dynamic(Shape::None, Return),
            BrS | Br => fixed(short_or_long(self), UnconditionalBranch, 0, 0),
            BrfalseS | BrtrueS | Brfalse | Brtrue => {
                fixed(short_or_long(self), ConditionalBranch, 1, 0)
            }
            BeqS | BgeS | BgtS | BleS | BltS | BneUnS | BgeUnS | BgtUnS | BleUnS | BltUnS
            | Beq | Bge | Bgt | Ble | Blt | BneUn | BgeUn | BgtUn | BleUn | BltUn => {
                fixed(short_or_long(self), ConditionalBranch, 2, 0)
            }
            Op::Switch => fixed(Shape::Switch, FlowKind::Switch, 1, 0),
            LdindI1 | LdindU1 | LdindI2 | LdindU2 | LdindI4 | LdindU4 | LdindI8 | LdindI
            | LdindR4 | LdindR8 | LdindRef => fixed(Shape::None, Sequential, 1, 1),
            StindRef | StindI1 | StindI2 | StindI4 | StindI8 | StindR4 | StindR8 | StindI => {
                fixed(Shape::None, Sequential, 2, 0)
            }
            Add | Sub | Mul | Div | DivUn | Rem | RemUn | And | Or | Xor | Shl | Shr | ShrUn => {
                fixed(Shape::None, Sequential, 2, 1)
            }
            Neg | Not => fixed(Shape::None, Sequential, 1, 1),
            ConvI1 | ConvI2 | ConvI4 | ConvI8 | ConvR4 | ConvR8 | ConvU4 | ConvU8 | ConvRUn
            | ConvU2 | ConvU1 | ConvI | ConvU => fixed(Shape::None, Sequential, 1, 1),
            ConvOvfI1Un | ConvOvfI2Un | ConvOvfI4Un | ConvOvfI8Un | ConvOvfU1Un | ConvOvfU2Un
            | ConvOvfU4Un | ConvOvfU8Un | ConvOvfIUn | ConvOvfUUn | ConvOvfI1 | ConvOvfU1
            | ConvOvfI2 | ConvOvfU2 | ConvOvfI4 | ConvOvfU4 | ConvOvfI8 | ConvOvfU8
            | ConvOvfI | ConvOvfU => fixed(Shape::None, Sequential, 1, 1),
            Cpobj => fixed(Shape::Token, Sequential, 2, 0),
            Ldobj => fixed(Shape::Token, Sequential, 1, 1),
            Ldstr => fixed(Shape::String, Sequential, 0, 1),
            Castclass | Isinst => fixed(Shape::Token, Sequential, 1, 1),
            Unbox | UnboxAny | Box => fixed(Shape::Token, Sequential, 1, 1),
            Op::Throw => fixed(Shape::None, FlowKind::Throw, 1, 0),
            Ldfld => fixed(Shape::Token, Sequential, 1, 1),
            Ldflda => fixed(Shape::Token, Sequential, 1, 1),
            Stfld => fixed(Shape::Token, Sequential, 2, 0),
            Ldsfld | Ldsflda => fixed(Shape::Token, Sequential, 0, 1),
            Stsfld => fixed(Shape::Token, Sequential, 1, 0),
            Stobj => fixed(Shape::Token, Sequential, 2, 0),
            Newarr => fixed(Shape::Token, Sequential, 1, 1),
            Ldlen => fixed(Shape::None, Sequential, 1, 1),
            Ldelema => fixed(Shape::Token, Sequential, 2, 1),
            LdelemI1 | LdelemU1 | LdelemI2 | LdelemU2 | LdelemI4 | LdelemU4 | LdelemI8
            | LdelemI | LdelemR4 | LdelemR8 | LdelemRef => fixed(Shape::None, Sequential, 2, 1),
            StelemI | StelemI1 | StelemI2 | StelemI4 | StelemI8 | StelemR4 | StelemR8
            | StelemRef => fixed(Shape::None, Sequential, 3, 0),
            Ldelem => fixed(Shape::Token, Sequential, 2, 1),
            Stelem => fixed(Shape::Token, Sequential, 3, 0),
            Refanyval | Mkrefany | Refanytype => fixed(Shape::Token, Sequential, 1, 1),
            Ckfinite => fixed(Shape::None, Sequential, 1, 1),
            Ldtoken => fixed(Shape::Token, Sequential, 0, 1),
            AddOvf | AddOvfUn | MulOvf | MulOvfUn | SubOvf | SubOvfUn => {
                fixed(Shape::None, Sequential, 2, 1)
            }
            Endfinally => fixed(Shape::None, EndRegion, 0, 0),
            Op::Leave => fixed(Shape::Target32, FlowKind::Leave, 0, 0),
            LeaveS => fixed(Shape::Target8, FlowKind::Leave, 0, 0),
            Arglist => fixed(Shape::None, Sequential, 0, 1),
            Ceq | Cgt | CgtUn | Clt | CltUn => fixed(Shape::None, Sequential, 2, 1),
            Ldftn => fixed(Shape::Token, Sequential, 0, 1),
            Ldvirtftn => fixed(Shape::Token, Sequential, 1, 1),
            Ldarg | Ldarga | Ldloc | Ldloca => fixed(Shape::UInt16, Sequential, 0, 1),
            Starg | Stloc => fixed(Shape::UInt16, Sequential, 1, 0),
            Localloc => fixed(Shape::None, Sequential, 1, 1),
            Endfilter => fixed(Shape::None, EndRegion, 1, 0),
            UnalignedPrefix => fixed(Shape::UInt8, Meta, 0, 0),
            VolatilePrefix | TailPrefix | ReadonlyPrefix => fixed(Shape::None, Meta, 0, 0),
            Initobj => fixed(Shape::Token, Sequential, 1, 0),
            ConstrainedPrefix => fixed(Shape::Token, Meta, 0, 0),
            Cpblk => fixed(Shape::None, Sequential, 3, 0),
            Initblk => fixed(Shape::None, Sequential, 3, 0),
            Rethrow => fixed(Shape::None, FlowKind::Throw, 0, 0),
            Sizeof => fixed(Shape::Token, Sequential, 0, 1),
        }
    }

    /// Whether this form transfers control through a single operand target.
    #[must_use]
    pub const fn is_branch(self) -> bool {
        matches!(
            self.info().flow,
            FlowKind::ConditionalBranch | FlowKind::UnconditionalBranch | FlowKind::Leave
        )
    }
}

const fn short_or_long(op: Op) -> OperandKind {
    // The short-form branch page spans br.s..blt.un.s; everything else is long form.
    match op {
        Op::BrS | Op::BrfalseS | Op::BrtrueS | Op::BeqS | Op::BgeS | Op::BgtS | Op::BleS
        | Op::BltS | Op::BneUnS | Op::BgeUnS | Op::BgtUnS | Op::BleUnS | Op::BltUnS => {
            OperandKind::Target8
        }
        _ => OperandKind::Target32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonics_match_encoding_pages() {
        assert_eq!(Op::Nop.mnemonic(), "nop");
        assert_eq!(Op::LdcI4S.mnemonic(), "ldc.i4.s");
        assert_eq!(Op::BneUnS.mnemonic(), "bne.un.s");
        assert_eq!(Op::ConstrainedPrefix.mnemonic(), "constrained.");

        assert_eq!(Op::Nop.encoding(), (None, 0x00));
        assert_eq!(Op::Ret.encoding(), (None, 0x2A));
        assert_eq!(Op::Ceq.encoding(), (Some(EXTENDED_PREFIX), 0x01));
        assert_eq!(Op::Sizeof.encoding(), (Some(EXTENDED_PREFIX), 0x1C));
    }

    #[test]
    fn opcode_sizes_follow_prefix_page() {
        assert_eq!(Op::Add.opcode_size(), 1);
        assert_eq!(Op::Ldftn.opcode_size(), 2);
    }

    #[test]
    fn branch_forms_carry_targets() {
        assert_eq!(Op::BrS.info().operand, OperandKind::Target8);
        assert_eq!(Op::Br.info().operand, OperandKind::Target32);
        assert_eq!(Op::BeqS.info().flow, FlowKind::ConditionalBranch);
        assert!(Op::Leave.is_branch());
        assert!(!Op::Call.is_branch());
    }

    #[test]
    fn signature_dependent_forms_have_no_fixed_stack() {
        assert!(Op::Call.info().stack.is_none());
        assert!(Op::Ret.info().stack.is_none());
        assert_eq!(
            Op::Add.info().stack,
            Some(StackBehavior { pops: 2, pushes: 1 })
        );
    }

    #[test]
    fn operand_shape_sizes() {
        assert_eq!(OperandKind::None.size(), Some(0));
        assert_eq!(OperandKind::Target8.size(), Some(1));
        assert_eq!(OperandKind::Token.size(), Some(4));
        assert_eq!(OperandKind::Float64.size(), Some(8));
        assert_eq!(OperandKind::Switch.size(), None);
    }
}
