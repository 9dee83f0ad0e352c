//! Standard opcode handlers.

use crate::effect::{EffectRequest, ParamValue};
use crate::env::{GameplayEvent, QueryReport, QueryShape, TargetList};
use crate::state::{
    AttributeId, BlackboardKey, BlackboardValue, EntityHandle, EventTag, ParamKey, TagId, TagSense,
    TemplateId, Vec2,
};

use super::{Flow, GraphError, GraphExecutionState as State, GraphInstruction as Ins, Opcode};

type OpResult = Result<Flow, GraphError>;

pub(crate) fn handler_for(op: Opcode) -> super::OpHandler {
    match op {
        Opcode::ConstFloat => const_float,
        Opcode::ConstInt => const_int,
        Opcode::ConstBool => const_bool,
        Opcode::LoadCaster => load_caster,
        Opcode::LoadExplicitTarget => load_explicit_target,
        Opcode::LoadContextSource => load_context_source,
        Opcode::LoadContextTarget => load_context_target,
        Opcode::LoadContextTargetContext => load_context_target_context,
        Opcode::LoadAttribute => load_attribute,
        Opcode::LoadSelfAttribute => load_self_attribute,
        Opcode::WriteSelfAttribute => write_self_attribute,
        Opcode::WriteAttribute => write_attribute,
        Opcode::ModifyAttributeAdd => modify_attribute_add,
        Opcode::LoadParamFloat => load_param_float,
        Opcode::LoadParamInt => load_param_int,
        Opcode::Add => add,
        Opcode::Sub => sub,
        Opcode::Mul => mul,
        Opcode::Div => div,
        Opcode::Clamp => clamp,
        Opcode::Neg => neg,
        Opcode::Abs => abs,
        Opcode::Min => min,
        Opcode::Max => max,
        Opcode::AddInt => add_int,
        Opcode::CompareGtFloat => compare_gt_float,
        Opcode::CompareLtFloat => compare_lt_float,
        Opcode::CompareEqInt => compare_eq_int,
        Opcode::Not => not,
        Opcode::HasTag => has_tag,
        Opcode::Jump => jump,
        Opcode::JumpIfFalse => jump_if_false,
        Opcode::ReadBlackboardFloat => read_blackboard_float,
        Opcode::WriteBlackboardFloat => write_blackboard_float,
        Opcode::ReadBlackboardInt => read_blackboard_int,
        Opcode::WriteBlackboardInt => write_blackboard_int,
        Opcode::ReadBlackboardEntity => read_blackboard_entity,
        Opcode::WriteBlackboardEntity => write_blackboard_entity,
        Opcode::QueryRadius => query_radius,
        Opcode::QueryCone => query_cone,
        Opcode::QueryRect => query_rect,
        Opcode::QueryLine => query_line,
        Opcode::QueryHexRange => query_hex_range,
        Opcode::QueryHexRing => query_hex_ring,
        Opcode::QueryFilterTagAll => query_filter_tag_all,
        Opcode::QuerySortStable => query_sort_stable,
        Opcode::QueryLimit => query_limit,
        Opcode::AggCount => agg_count,
        Opcode::AggMinByDistance => agg_min_by_distance,
        Opcode::PushArgFloat => push_arg_float,
        Opcode::PushArgInt => push_arg_int,
        Opcode::ApplyEffectTemplate => apply_effect_template,
        Opcode::ApplyEffectDynamic => apply_effect_dynamic,
        Opcode::FanOutApplyEffectDynamic => fan_out_apply_effect_dynamic,
        Opcode::SendEvent => send_event,
        Opcode::SelectEntity => select_entity,
        Opcode::Halt => halt,
    }
}

// ===== constants and entity loads =====

fn const_float(state: &mut State<'_>, ins: &Ins) -> OpResult {
    state.registers.set_float(ins.a, ins.imm_float)?;
    Ok(Flow::Next)
}

fn const_int(state: &mut State<'_>, ins: &Ins) -> OpResult {
    state.registers.set_int(ins.a, ins.imm_int)?;
    Ok(Flow::Next)
}

fn const_bool(state: &mut State<'_>, ins: &Ins) -> OpResult {
    state.registers.set_bool(ins.a, ins.imm_int != 0)?;
    Ok(Flow::Next)
}

fn load_caster(state: &mut State<'_>, ins: &Ins) -> OpResult {
    state.registers.set_entity(ins.a, state.caster)?;
    Ok(Flow::Next)
}

fn load_explicit_target(state: &mut State<'_>, ins: &Ins) -> OpResult {
    state.registers.set_entity(ins.a, state.explicit_target)?;
    Ok(Flow::Next)
}

fn load_context_source(state: &mut State<'_>, ins: &Ins) -> OpResult {
    state.registers.set_entity(ins.a, state.context.source)?;
    Ok(Flow::Next)
}

fn load_context_target(state: &mut State<'_>, ins: &Ins) -> OpResult {
    state.registers.set_entity(ins.a, state.context.target)?;
    Ok(Flow::Next)
}

fn load_context_target_context(state: &mut State<'_>, ins: &Ins) -> OpResult {
    state.registers.set_entity(ins.a, state.context.target_context)?;
    Ok(Flow::Next)
}

// ===== attributes and parameters =====

fn attribute_id(ins: &Ins) -> AttributeId {
    AttributeId(ins.imm_int as u16)
}

fn load_attribute(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let entity = state.registers.entity(ins.b)?;
    let value = state.api.world.attribute(entity, attribute_id(ins));
    state.registers.set_float(ins.a, value.unwrap_or(0.0))?;
    Ok(Flow::Next)
}

fn load_self_attribute(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let value = state.api.world.attribute(state.caster, attribute_id(ins));
    state.registers.set_float(ins.a, value.unwrap_or(0.0))?;
    Ok(Flow::Next)
}

fn write_self_attribute(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let value = state.registers.float(ins.a)?;
    state
        .api
        .world
        .set_attribute(state.caster, attribute_id(ins), value);
    Ok(Flow::Next)
}

fn write_attribute(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let value = state.registers.float(ins.a)?;
    let entity = state.registers.entity(ins.b)?;
    state.api.world.set_attribute(entity, attribute_id(ins), value);
    Ok(Flow::Next)
}

fn modify_attribute_add(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let delta = state.registers.float(ins.a)?;
    let entity = state.registers.entity(ins.b)?;
    state.api.world.add_attribute(entity, attribute_id(ins), delta);
    Ok(Flow::Next)
}

fn load_param_float(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let value = state
        .params
        .float(ParamKey(ins.imm_int as u16))
        .unwrap_or(ins.imm_float);
    state.registers.set_float(ins.a, value)?;
    Ok(Flow::Next)
}

fn load_param_int(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let key = ParamKey(ins.imm_int as u16);
    let value = match state.params.get(key) {
        Some(ParamValue::Int(value)) => value,
        Some(ParamValue::Template(id)) => id.0 as i32,
        Some(ParamValue::Attribute(id)) => id.0 as i32,
        Some(ParamValue::Float(value)) => value as i32,
        None => 0,
    };
    state.registers.set_int(ins.a, value)?;
    Ok(Flow::Next)
}

// ===== arithmetic =====

fn binary(state: &mut State<'_>, ins: &Ins, f: impl Fn(f32, f32) -> f32) -> OpResult {
    let lhs = state.registers.float(ins.b)?;
    let rhs = state.registers.float(ins.c)?;
    state.registers.set_float(ins.a, f(lhs, rhs))?;
    Ok(Flow::Next)
}

fn unary(state: &mut State<'_>, ins: &Ins, f: impl Fn(f32) -> f32) -> OpResult {
    let value = state.registers.float(ins.b)?;
    state.registers.set_float(ins.a, f(value))?;
    Ok(Flow::Next)
}

fn add(state: &mut State<'_>, ins: &Ins) -> OpResult {
    binary(state, ins, |a, b| a + b)
}

fn sub(state: &mut State<'_>, ins: &Ins) -> OpResult {
    binary(state, ins, |a, b| a - b)
}

fn mul(state: &mut State<'_>, ins: &Ins) -> OpResult {
    binary(state, ins, |a, b| a * b)
}

fn div(state: &mut State<'_>, ins: &Ins) -> OpResult {
    binary(state, ins, |a, b| a / b)
}

fn min(state: &mut State<'_>, ins: &Ins) -> OpResult {
    binary(state, ins, f32::min)
}

fn max(state: &mut State<'_>, ins: &Ins) -> OpResult {
    binary(state, ins, f32::max)
}

fn clamp(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let value = state.registers.float(ins.a)?;
    let lo = state.registers.float(ins.b)?;
    let hi = state.registers.float(ins.c)?;
    // Not f32::clamp: that panics when lo > hi.
    state.registers.set_float(ins.a, value.max(lo).min(hi))?;
    Ok(Flow::Next)
}

fn neg(state: &mut State<'_>, ins: &Ins) -> OpResult {
    unary(state, ins, |value| -value)
}

fn abs(state: &mut State<'_>, ins: &Ins) -> OpResult {
    unary(state, ins, f32::abs)
}

fn add_int(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let lhs = state.registers.int(ins.b)?;
    let rhs = state.registers.int(ins.c)?;
    state.registers.set_int(ins.a, lhs.wrapping_add(rhs))?;
    Ok(Flow::Next)
}

// ===== compare and branch =====

fn compare_gt_float(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let lhs = state.registers.float(ins.b)?;
    let rhs = state.registers.float(ins.c)?;
    state.registers.set_bool(ins.a, lhs > rhs)?;
    Ok(Flow::Next)
}

fn compare_lt_float(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let lhs = state.registers.float(ins.b)?;
    let rhs = state.registers.float(ins.c)?;
    state.registers.set_bool(ins.a, lhs < rhs)?;
    Ok(Flow::Next)
}

fn compare_eq_int(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let lhs = state.registers.int(ins.b)?;
    let rhs = state.registers.int(ins.c)?;
    state.registers.set_bool(ins.a, lhs == rhs)?;
    Ok(Flow::Next)
}

fn not(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let value = state.registers.bool(ins.b)?;
    state.registers.set_bool(ins.a, !value)?;
    Ok(Flow::Next)
}

fn has_tag(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let entity = state.registers.entity(ins.b)?;
    let sense = if ins.c == 1 {
        TagSense::Effective
    } else {
        TagSense::Present
    };
    let present = state
        .api
        .world
        .has_tag(entity, TagId(ins.imm_int as u16), sense);
    state.registers.set_bool(ins.a, present)?;
    Ok(Flow::Next)
}

fn jump(_state: &mut State<'_>, ins: &Ins) -> OpResult {
    Ok(Flow::Jump(ins.imm_int))
}

fn jump_if_false(state: &mut State<'_>, ins: &Ins) -> OpResult {
    if state.registers.bool(ins.a)? {
        Ok(Flow::Next)
    } else {
        Ok(Flow::Jump(ins.imm_int))
    }
}

// ===== blackboard =====

fn blackboard_key(ins: &Ins) -> BlackboardKey {
    BlackboardKey(ins.imm_int as u16)
}

fn read_blackboard(state: &State<'_>, ins: &Ins) -> Result<Option<BlackboardValue>, GraphError> {
    let entity = state.registers.entity(ins.b)?;
    Ok(state
        .api
        .world
        .blackboard(entity)
        .and_then(|board| board.get(blackboard_key(ins))))
}

fn write_blackboard(state: &mut State<'_>, ins: &Ins, value: BlackboardValue) -> OpResult {
    let entity = state.registers.entity(ins.b)?;
    if let Some(board) = state.api.world.blackboard_mut(entity) {
        board.set(blackboard_key(ins), value);
    }
    Ok(Flow::Next)
}

fn read_blackboard_float(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let value = match read_blackboard(state, ins)? {
        Some(BlackboardValue::Float(value)) => value,
        Some(BlackboardValue::Int(value)) => value as f32,
        _ => 0.0,
    };
    state.registers.set_float(ins.a, value)?;
    Ok(Flow::Next)
}

fn write_blackboard_float(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let value = state.registers.float(ins.a)?;
    write_blackboard(state, ins, BlackboardValue::Float(value))
}

fn read_blackboard_int(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let value = match read_blackboard(state, ins)? {
        Some(BlackboardValue::Int(value)) => value,
        Some(BlackboardValue::Float(value)) => value as i32,
        _ => 0,
    };
    state.registers.set_int(ins.a, value)?;
    Ok(Flow::Next)
}

fn write_blackboard_int(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let value = state.registers.int(ins.a)?;
    write_blackboard(state, ins, BlackboardValue::Int(value))
}

fn read_blackboard_entity(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let value = match read_blackboard(state, ins)? {
        Some(BlackboardValue::Entity(value)) => value,
        _ => EntityHandle::NULL,
    };
    state.registers.set_entity(ins.a, value)?;
    Ok(Flow::Next)
}

fn write_blackboard_entity(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let value = state.registers.entity(ins.a)?;
    write_blackboard(state, ins, BlackboardValue::Entity(value))
}

// ===== spatial queries =====

fn float_at(state: &State<'_>, base: u8, offset: u8) -> Result<f32, GraphError> {
    state.registers.float(base.saturating_add(offset))
}

fn run_query(
    state: &mut State<'_>,
    ins: &Ins,
    shape: impl FnOnce(Vec2) -> QueryShape,
) -> OpResult {
    let spatial = state.api.spatial()?;
    let origin_entity = state.registers.entity(ins.b)?;
    state.registers.targets_mut(ins.a)?.clear();
    // An origin entity with no known position matches nothing.
    let Some(origin) = state.origin_of(origin_entity) else {
        return Ok(Flow::Next);
    };
    let shape = shape(origin);
    let out = state.registers.targets_mut(ins.a)?;
    let report: QueryReport = spatial.query(&shape, out);
    state.query_dropped += report.dropped;
    if report.dropped > 0 {
        tracing::warn!(
            target: "core::graph",
            op = ins.op.name(),
            found = report.found,
            dropped = report.dropped,
            "spatial query overflowed target list"
        );
    }
    Ok(Flow::Next)
}

fn query_radius(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let radius = float_at(state, ins.c, 0)?;
    run_query(state, ins, |origin| QueryShape::Radius { origin, radius })
}

fn query_cone(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let direction = float_at(state, ins.c, 0)?;
    let half_angle = float_at(state, ins.c, 1)?;
    let radius = float_at(state, ins.c, 2)?;
    run_query(state, ins, |origin| QueryShape::Cone {
        origin,
        direction,
        half_angle,
        radius,
    })
}

fn query_rect(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let half_extents = Vec2::new(float_at(state, ins.c, 0)?, float_at(state, ins.c, 1)?);
    run_query(state, ins, |center| QueryShape::Rect {
        center,
        half_extents,
    })
}

fn query_line(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let direction = float_at(state, ins.c, 0)?;
    let length = float_at(state, ins.c, 1)?;
    let half_width = float_at(state, ins.c, 2)?;
    run_query(state, ins, |origin| QueryShape::Line {
        origin,
        direction,
        length,
        half_width,
    })
}

fn query_hex_range(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let cell_size = float_at(state, ins.c, 0)?;
    let radius = ins.imm_int.max(0) as u32;
    run_query(state, ins, |origin| QueryShape::HexRange {
        origin,
        cell_size,
        radius,
    })
}

fn query_hex_ring(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let cell_size = float_at(state, ins.c, 0)?;
    let radius = ins.imm_int.max(0) as u32;
    run_query(state, ins, |origin| QueryShape::HexRing {
        origin,
        cell_size,
        radius,
    })
}

fn query_filter_tag_all(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let mut tags = [TagId(0); 16];
    let count = if ins.c == 0 {
        tags[0] = TagId(ins.imm_int as u16);
        1
    } else {
        let count = (ins.c as usize).min(tags.len());
        for (offset, tag) in tags.iter_mut().take(count).enumerate() {
            *tag = TagId(state.registers.int(ins.b.saturating_add(offset as u8))? as u16);
        }
        count
    };
    let tags = &tags[..count];

    let world = &*state.api.world;
    let list = state.registers.targets_mut(ins.a)?;
    list.retain(|entity| {
        tags.iter()
            .all(|tag| world.has_tag(*entity, *tag, TagSense::Present))
    });
    Ok(Flow::Next)
}

fn sort_by_distance(
    list: &mut TargetList,
    origin: Vec2,
    positions: impl Fn(EntityHandle) -> Vec2,
) {
    list.sort_unstable_by(|lhs, rhs| {
        let dl = positions(*lhs).distance_squared(origin);
        let dr = positions(*rhs).distance_squared(origin);
        dl.total_cmp(&dr).then_with(|| lhs.cmp(rhs))
    });
}

fn query_sort_stable(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let origin_entity = state.registers.entity(ins.b)?;
    let origin = state.origin_of(origin_entity).unwrap_or(state.target_position);
    let spatial = state.api.spatial;
    let world = &*state.api.world;
    let list = state.registers.targets_mut(ins.a)?;
    sort_by_distance(list, origin, |entity| {
        spatial
            .and_then(|spatial| spatial.position(entity))
            .or_else(|| world.position(entity))
            .unwrap_or(Vec2::new(f32::INFINITY, f32::INFINITY))
    });
    Ok(Flow::Next)
}

fn query_limit(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let limit = ins.imm_int.max(0) as usize;
    state.registers.targets_mut(ins.a)?.truncate(limit);
    Ok(Flow::Next)
}

fn agg_count(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let count = state.registers.targets(ins.b)?.len();
    state.registers.set_int(ins.a, count as i32)?;
    Ok(Flow::Next)
}

fn agg_min_by_distance(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let origin_entity = state.registers.entity(ins.c)?;
    let origin = state.origin_of(origin_entity).unwrap_or(state.target_position);
    let mut best: Option<(f32, EntityHandle)> = None;
    for entity in state.registers.targets(ins.b)? {
        let Some(position) = state.origin_of(*entity) else {
            continue;
        };
        let distance = position.distance_squared(origin);
        let closer = match best {
            None => true,
            Some((best_distance, best_entity)) => distance
                .total_cmp(&best_distance)
                .then_with(|| entity.cmp(&best_entity))
                .is_lt(),
        };
        if closer {
            best = Some((distance, *entity));
        }
    }
    let nearest = best.map_or(EntityHandle::NULL, |(_, entity)| entity);
    state.registers.set_entity(ins.a, nearest)?;
    Ok(Flow::Next)
}

// ===== effect dispatch and events =====

fn push_arg_float(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let value = state.registers.float(ins.a)?;
    state
        .args
        .set(ParamKey(ins.imm_int as u16), ParamValue::Float(value));
    Ok(Flow::Next)
}

fn push_arg_int(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let value = state.registers.int(ins.a)?;
    state
        .args
        .set(ParamKey(ins.imm_int as u16), ParamValue::Int(value));
    Ok(Flow::Next)
}

fn publish(
    state: &mut State<'_>,
    template: TemplateId,
    target: EntityHandle,
    context: EntityHandle,
) -> Result<(), GraphError> {
    let request = EffectRequest::new(template, state.caster, target)
        .with_root(state.root)
        .with_context(context)
        .with_params(state.args.clone());
    state.api.requests()?.publish(request);
    Ok(())
}

fn apply_effect_template(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let target = state.registers.entity(ins.a)?;
    let context = state.registers.entity(ins.b)?;
    publish(state, TemplateId(ins.imm_int as u32), target, context)?;
    state.args.clear();
    Ok(Flow::Next)
}

fn apply_effect_dynamic(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let target = state.registers.entity(ins.a)?;
    let template = TemplateId(state.registers.int(ins.b)? as u32);
    publish(state, template, target, EntityHandle::NULL)?;
    state.args.clear();
    Ok(Flow::Next)
}

fn fan_out_apply_effect_dynamic(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let template = TemplateId(state.registers.int(ins.b)? as u32);
    // Fail before the loop so an empty list still reports a missing queue.
    state.api.requests()?;
    let count = state.registers.targets(ins.a)?.len();
    for index in 0..count {
        let target = state.registers.targets(ins.a)?[index];
        publish(state, template, target, EntityHandle::NULL)?;
    }
    state.args.clear();
    Ok(Flow::Next)
}

fn send_event(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let target = state.registers.entity(ins.a)?;
    let magnitude = state.registers.float(ins.b)?;
    let event = GameplayEvent::gameplay(
        EventTag(ins.imm_int as u16),
        state.caster,
        target,
        magnitude,
    );
    state.api.events()?.publish(event);
    Ok(Flow::Next)
}

fn select_entity(state: &mut State<'_>, ins: &Ins) -> OpResult {
    let condition = state.registers.bool(ins.c)?;
    let chosen = if condition {
        state.registers.entity(ins.b)?
    } else {
        state.registers.entity(ins.imm_int.clamp(0, u8::MAX as i32) as u8)?
    };
    state.registers.set_entity(ins.a, chosen)?;
    Ok(Flow::Next)
}

fn halt(_state: &mut State<'_>, _ins: &Ins) -> OpResult {
    Ok(Flow::Halt)
}
