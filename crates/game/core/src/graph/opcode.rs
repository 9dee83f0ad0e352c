use strum::{EnumCount, EnumIter, IntoStaticStr};

/// Instruction set of the phase-graph VM.
///
/// Operand conventions: `a` is the destination (or primary) register, `b`
/// and `c` are sources. `f`, `i`, `b`, `e`, `t` below denote the float, int,
/// bool, entity and target-list banks. `imm` is `imm_int` unless noted.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumCount, EnumIter, IntoStaticStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum Opcode {
    /// `f[a] = imm_float`
    ConstFloat,
    /// `i[a] = imm`
    ConstInt,
    /// `b[a] = imm != 0`
    ConstBool,

    /// `e[a] = caster`
    LoadCaster,
    /// `e[a] = explicit target`
    LoadExplicitTarget,
    /// `e[a] = triggering effect's source`
    LoadContextSource,
    /// `e[a] = triggering effect's target`
    LoadContextTarget,
    /// `e[a] = triggering effect's target context`
    LoadContextTargetContext,

    /// `f[a] = attribute(e[b], imm)`, zero when absent.
    LoadAttribute,
    /// `f[a] = attribute(caster, imm)`, zero when absent.
    LoadSelfAttribute,
    /// `attribute(caster, imm) = f[a]`
    WriteSelfAttribute,
    /// `attribute(e[b], imm) = f[a]`
    WriteAttribute,
    /// `attribute(e[b], imm) += f[a]`
    ModifyAttributeAdd,
    /// `f[a] = param(imm)`, falling back to `imm_float`.
    LoadParamFloat,
    /// `i[a] = param(imm)`, zero when absent.
    LoadParamInt,

    /// `f[a] = f[b] + f[c]`
    Add,
    Sub,
    Mul,
    /// IEEE division; dividing by zero yields an infinity or NaN.
    Div,
    /// `f[a] = min(max(f[a], f[b]), f[c])`
    Clamp,
    /// `f[a] = -f[b]`
    Neg,
    /// `f[a] = |f[b]|`
    Abs,
    Min,
    Max,
    /// `i[a] = i[b] + i[c]`, wrapping.
    AddInt,

    /// `b[a] = f[b] > f[c]`
    CompareGtFloat,
    /// `b[a] = f[b] < f[c]`
    CompareLtFloat,
    /// `b[a] = i[b] == i[c]`
    CompareEqInt,
    /// `b[a] = !b[b]`
    Not,
    /// `b[a] = has_tag(e[b], imm)`; `c == 1` selects the effective sense.
    HasTag,
    /// `pc = pc + 1 + imm`
    Jump,
    /// Jumps when `b[a]` is false.
    JumpIfFalse,

    /// `f[a] = blackboard(e[b])[imm]`
    ReadBlackboardFloat,
    /// `blackboard(e[b])[imm] = f[a]`
    WriteBlackboardFloat,
    ReadBlackboardInt,
    WriteBlackboardInt,
    ReadBlackboardEntity,
    WriteBlackboardEntity,

    /// `t[a] = entities within f[c] of origin`
    ///
    /// All queries take their origin from `e[b]`, or the target position when
    /// `e[b]` is null.
    QueryRadius,
    /// Direction `f[c]`, half angle `f[c+1]`, radius `f[c+2]`.
    QueryCone,
    /// Half extents `f[c]`, `f[c+1]`.
    QueryRect,
    /// Direction `f[c]`, length `f[c+1]`, half width `f[c+2]`.
    QueryLine,
    /// Cell size `f[c]`, radius `imm` cells.
    QueryHexRange,
    /// Cell size `f[c]`, ring `imm` cells out.
    QueryHexRing,
    /// Keeps entries of `t[a]` carrying every tag in `i[b]..i[b+c]`.
    ///
    /// `c == 0` filters on the single tag `imm`.
    QueryFilterTagAll,
    /// Sorts `t[a]` by distance to the origin `e[b]`, ties broken by handle.
    QuerySortStable,
    /// Truncates `t[a]` to `imm` entries.
    QueryLimit,
    /// `i[a] = len(t[b])`
    AggCount,
    /// `e[a] = entry of t[b] nearest the origin e[c]`, null when empty.
    AggMinByDistance,

    /// Stages `param(imm) = f[a]` for the next dispatch.
    PushArgFloat,
    /// Stages `param(imm) = i[a]` for the next dispatch.
    PushArgInt,
    /// Requests template `imm` from the caster onto `e[a]`, context `e[b]`.
    ApplyEffectTemplate,
    /// Requests template `i[b]` onto `e[a]`.
    ApplyEffectDynamic,
    /// Requests template `i[b]` onto every entry of `t[a]`.
    FanOutApplyEffectDynamic,
    /// Publishes event `imm` from the caster to `e[a]` with magnitude `f[b]`.
    SendEvent,
    /// `e[a] = if b[c] { e[b] } else { e[imm] }`
    SelectEntity,
    Halt,
}

impl Opcode {
    /// Whether the opcode writes world state or publishes to a capability.
    pub fn is_mutating(self) -> bool {
        matches!(
            self,
            Opcode::WriteSelfAttribute
                | Opcode::WriteAttribute
                | Opcode::ModifyAttributeAdd
                | Opcode::WriteBlackboardFloat
                | Opcode::WriteBlackboardInt
                | Opcode::WriteBlackboardEntity
                | Opcode::ApplyEffectTemplate
                | Opcode::ApplyEffectDynamic
                | Opcode::FanOutApplyEffectDynamic
                | Opcode::SendEvent
        )
    }

    pub fn is_jump(self) -> bool {
        matches!(self, Opcode::Jump | Opcode::JumpIfFalse)
    }

    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// One VM instruction.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GraphInstruction {
    pub op: Opcode,
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub imm_int: i32,
    pub imm_float: f32,
}

impl GraphInstruction {
    pub const fn new(op: Opcode, a: u8, b: u8, c: u8) -> Self {
        Self {
            op,
            a,
            b,
            c,
            imm_int: 0,
            imm_float: 0.0,
        }
    }

    pub const fn with_int(mut self, imm_int: i32) -> Self {
        self.imm_int = imm_int;
        self
    }

    pub const fn with_float(mut self, imm_float: f32) -> Self {
        self.imm_float = imm_float;
        self
    }

    pub const fn const_float(a: u8, value: f32) -> Self {
        Self::new(Opcode::ConstFloat, a, 0, 0).with_float(value)
    }

    pub const fn const_int(a: u8, value: i32) -> Self {
        Self::new(Opcode::ConstInt, a, 0, 0).with_int(value)
    }

    pub const fn const_bool(a: u8, value: bool) -> Self {
        Self::new(Opcode::ConstBool, a, 0, 0).with_int(value as i32)
    }

    pub const fn jump(offset: i32) -> Self {
        Self::new(Opcode::Jump, 0, 0, 0).with_int(offset)
    }

    pub const fn jump_if_false(condition: u8, offset: i32) -> Self {
        Self::new(Opcode::JumpIfFalse, condition, 0, 0).with_int(offset)
    }

    pub const fn halt() -> Self {
        Self::new(Opcode::Halt, 0, 0, 0)
    }
}
