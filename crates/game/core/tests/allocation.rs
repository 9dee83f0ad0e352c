//! Steady-state ticks must not touch the heap.
//!
//! A counting global allocator records allocations made on the current
//! thread; the measured loop publishes requests, runs the response chain to
//! completion and advances effect lifetimes.

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

use ability_core::chain::{ChainEnv, ResponseChainEngine, ResponseChainListener};
use ability_core::clock::{ClockDomain, Tick};
use ability_core::config::ChainConfig;
use ability_core::effect::{
    EffectRequest, EffectTemplate, LifetimeEnv, ModifierOp, ParamValue, keys, update_lifetimes,
};
use ability_core::env::{EventBuffer, OrderQueue, RequestQueue};
use ability_core::graph::{GraphInstruction as I, Opcode, OpcodeTable, RegisterBanks};
use ability_core::phase::{LifecyclePhase, PhaseSlot};
use ability_core::registry::Registries;
use ability_core::state::{AttributeId, EntityHandle, PresetType, ProgramId, TagId, TemplateId, World};

struct CountingAllocator;

thread_local! {
    static ALLOCATIONS: Cell<usize> = const { Cell::new(0) };
}

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let _ = ALLOCATIONS.try_with(|count| count.set(count.get() + 1));
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let _ = ALLOCATIONS.try_with(|count| count.set(count.get() + 1));
        unsafe { System.realloc(ptr, layout, new_size) }
    }
}

#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator;

fn allocations() -> usize {
    ALLOCATIONS.with(Cell::get)
}

const HEALTH: AttributeId = AttributeId(10);
const WARD: AttributeId = AttributeId(11);
const STRIKE: TagId = TagId(1);

const HIT: TemplateId = TemplateId(1);
const RIPOSTE: TemplateId = TemplateId(2);
const WARDED: TemplateId = TemplateId(3);
const PUSH: TemplateId = TemplateId(4);

struct Scenario {
    world: World,
    registries: Registries,
    opcodes: OpcodeTable,
    requests: RequestQueue,
    events: EventBuffer,
    orders: OrderQueue,
    engine: ResponseChainEngine,
    registers: RegisterBanks,
    entities: Vec<EntityHandle>,
    now: Tick,
}

impl Scenario {
    fn new() -> Self {
        let mut registries = Registries::new();
        // OnHit: HEALTH -= 1 on the explicit target.
        registries
            .register_instructions(
                ProgramId(1),
                vec![
                    I::new(Opcode::LoadExplicitTarget, 0, 0, 0),
                    I::const_float(0, -1.0),
                    I::new(Opcode::ModifyAttributeAdd, 0, 0, 0).with_int(HEALTH.0 as i32),
                ],
            )
            .unwrap();
        let templates = [
            EffectTemplate::builder(HIT, STRIKE)
                .bind(LifecyclePhase::OnHit, PhaseSlot::Main, ProgramId(1))
                .build(),
            EffectTemplate::builder(RIPOSTE, TagId(2))
                .modifier(HEALTH, ModifierOp::Add, -2.0)
                .build(),
            EffectTemplate::builder(WARDED, TagId(3))
                .lasting(ClockDomain::FixedFrame, 2)
                .modifier(WARD, ModifierOp::Add, 1.0)
                .build(),
            EffectTemplate::builder(PUSH, TagId(4))
                .preset(PresetType::APPLY_FORCE_2D)
                .build(),
        ];
        for template in templates {
            registries.register_template(template).unwrap();
        }

        let mut world = World::with_capacity(4);
        let entities: Vec<_> = (0..4).map(|_| world.spawn()).collect();
        for &entity in &entities {
            world.set_attribute(entity, HEALTH, 1_000.0);
            world.set_attribute(entity, WARD, 0.0);
            world.set_attribute(entity, AttributeId::FORCE_REQUEST_X, 0.0);
            world.set_attribute(entity, AttributeId::FORCE_REQUEST_Y, 0.0);
            world
                .get_mut(entity)
                .unwrap()
                .listeners
                .push(ResponseChainListener::chain(STRIKE, RIPOSTE, 0));
        }

        Self {
            world,
            registries,
            opcodes: OpcodeTable::standard(),
            requests: RequestQueue::default(),
            events: EventBuffer::default(),
            orders: OrderQueue::default(),
            engine: ResponseChainEngine::new(ChainConfig::default()),
            registers: RegisterBanks::new(),
            entities,
            now: Tick::ZERO,
        }
    }

    fn tick(&mut self) {
        for pair in self.entities.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            self.requests.publish(EffectRequest::new(HIT, a, b));
            self.requests.publish(EffectRequest::new(WARDED, a, b));
            self.requests.publish(
                EffectRequest::new(PUSH, a, b).with_param(keys::FORCE_X, ParamValue::Float(1.0)),
            );
        }

        self.engine.begin_tick(&self.requests);
        loop {
            let mut env = ChainEnv {
                world: &mut self.world,
                registries: &self.registries,
                opcodes: &self.opcodes,
                spatial: None,
                requests: &mut self.requests,
                events: &mut self.events,
                orders: &mut self.orders,
                now: self.now,
            };
            if self.engine.update_slice(&mut env, 2).unwrap().is_done() {
                break;
            }
            self.engine.reset_slice();
        }

        let mut env = LifetimeEnv {
            world: &mut self.world,
            registries: &self.registries,
            opcodes: &self.opcodes,
            spatial: None,
            requests: &mut self.requests,
            events: &mut self.events,
        };
        update_lifetimes(&mut env, &mut self.registers, ClockDomain::FixedFrame).unwrap();

        self.events.clear();
        self.now = self.now + 1;
    }
}

#[test]
fn steady_state_ticks_do_not_allocate() {
    let mut scenario = Scenario::new();
    for _ in 0..4 {
        scenario.tick();
    }

    let before = allocations();
    for _ in 0..32 {
        scenario.tick();
    }
    let during = allocations() - before;

    assert_eq!(during, 0, "steady-state ticks allocated {during} times");
    assert!(scenario.engine.budget().committed > 0);
    assert_eq!(scenario.engine.budget().dropped, 0);
}
