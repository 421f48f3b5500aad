use super::*;
use crate::bridge::{share, BridgeCall, RecordingBridge};
use crate::clock::ManualClock;
use crate::config::SyncConfig;
use crate::error::BridgeError;
use parking_lot::Mutex;
use skirmish_shared::Space;
use std::sync::Arc;

struct Harness {
    bridge: Arc<Mutex<RecordingBridge>>,
    clock: ManualClock,
    services: Services,
}

impl Harness {
    fn new() -> Self {
        let (bridge, shared) = share(RecordingBridge::new());
        let clock = ManualClock::default();
        let services = Services::with_clock(shared, Arc::new(clock.clone()), SyncConfig::default());
        Self { bridge, clock, services }
    }

    fn entity(&self, space: u32, id: u32) -> Entity {
        let address = EntityAddress::new(space, id);
        Entity::new(address, EntityKind::for_space(space), self.services.clone())
    }
}

fn vec2(x: f32, y: f32) -> PropertyValue {
    PropertyValue::Vec2(Vec2::new(x, y))
}

fn placed(x: f32, y: f32) -> PropertyBag {
    PropertyBag::new().with(Prop::POS, vec2(x, y)).with(Prop::DIM, vec2(1.0, 1.0))
}

fn aimed(owner: EntityAddress) -> PropertyBag {
    placed(0.0, 0.0)
        .with(Prop::OWNER, PropertyValue::Address(owner))
        .with(Prop::DIR, vec2(1.0, 0.0))
        .with(Prop::VEL, vec2(2.0, 0.0))
}

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-5
}

// ============================================================================
// Store-backed reads
// ============================================================================

#[test]
fn test_stale_duplicate_keeps_newer_position() {
    let h = Harness::new();
    let mut e = h.entity(Space::PLAYER, 1);

    e.set_data(PropertyBag::new().with(Prop::POS, vec2(1.0, 1.0)), Some(2));
    e.set_data(PropertyBag::new().with(Prop::POS, vec2(9.0, 9.0)), Some(1));

    assert_eq!(e.pos(), Vec2::new(1.0, 1.0));
    assert_eq!(e.seq_num(Prop::POS), 2);
}

#[test]
fn test_ready_needs_pos_and_dim() {
    let h = Harness::new();
    let mut e = h.entity(Space::PLAYER, 1);
    assert!(!e.ready());

    e.set_data(PropertyBag::new().with(Prop::POS, vec2(0.0, 0.0)), Some(1));
    assert!(!e.ready());

    e.set_data(PropertyBag::new().with(Prop::DIM, vec2(1.0, 1.0)), Some(2));
    assert!(e.ready());
}

#[test]
fn test_int_attribute_defaults_to_zero() {
    let h = Harness::new();
    let mut e = h.entity(Space::PLAYER, 1);
    assert_eq!(e.int_attribute(IntAttribute::COLOR), 0);
    assert!(!e.has_int_attribute(IntAttribute::COLOR));

    let channel = [(IntAttribute::SECONDARY_COLOR, 7)].into_iter().collect();
    e.set_data(PropertyBag::new().with(Prop::INT_ATTRIBUTES, PropertyValue::IntAttributes(channel)), Some(1));

    assert_eq!(e.int_attribute(IntAttribute::COLOR), 0);
    assert_eq!(e.int_attribute(IntAttribute::SECONDARY_COLOR), 7);
    assert!(e.has_secondary_color());
    assert_eq!(e.int_attributes().len(), 1);
}

#[test]
fn test_derived_value_survives_removal() {
    let h = Harness::new();
    let mut e = h.entity(Space::PLAYER, 1);

    e.set_data(placed(3.0, 4.0), Some(1));
    assert_eq!(e.pos(), Vec2::new(3.0, 4.0));

    e.remove_prop(Prop::POS);
    assert!(!e.has_pos());
    assert_eq!(e.pos(), Vec2::new(3.0, 4.0));
}

#[test]
fn test_derived_value_without_history_is_zero() {
    let h = Harness::new();
    let e = h.entity(Space::PLAYER, 1);
    assert_eq!(e.vel(), Vec2::ZERO);
    assert_eq!(e.owner(), EntityAddress::NONE);
    assert_eq!(e.dim3(), Vec3::ZERO);
}

#[test]
fn test_deleted_sources() {
    let h = Harness::new();

    let mut by_flag = h.entity(Space::PLAYER, 1);
    by_flag.set_data(PropertyBag::new().with(Prop::DELETED, PropertyValue::Flag(true)), Some(1));
    assert!(by_flag.deleted());

    let mut by_attr = h.entity(Space::PLAYER, 2);
    let channel = [(Attribute::DELETED, true)].into_iter().collect();
    by_attr.set_data(PropertyBag::new().with(Prop::ATTRIBUTES, PropertyValue::Attributes(channel)), Some(1));
    assert!(by_attr.deleted());

    let mut cleared = h.entity(Space::PLAYER, 3);
    cleared.set_data(PropertyBag::new().with(Prop::DELETED, PropertyValue::Flag(false)), Some(1));
    assert!(!cleared.deleted());
}

#[test]
fn test_pos3_z_sources() {
    let h = Harness::new();
    let mut e = h.entity(Space::PLAYER, 1);
    e.set_data(placed(1.0, 2.0), Some(1));
    assert!(approx(e.pos3().z, 0.0));

    e.set_mesh(Mesh::at(Vec3::new(0.0, 0.0, 3.0)));
    assert!(approx(e.pos3().z, 3.0));

    let channel = [(FloatAttribute::POS_Z, 5.0)].into_iter().collect();
    e.set_data(PropertyBag::new().with(Prop::FLOAT_ATTRIBUTES, PropertyValue::FloatAttributes(channel)), Some(2));
    assert!(approx(e.pos3().z, 5.0));

    e.set_data(PropertyBag::new().with(Prop::POS_Z, PropertyValue::Float(7.0)), Some(3));
    assert!(approx(e.pos3().z, 7.0));
}

#[test]
fn test_dim3_takes_depth_from_float_channel() {
    let h = Harness::new();
    let mut e = h.entity(Space::PLAYER, 1);
    let channel = [(FloatAttribute::DIM_Z, 2.5)].into_iter().collect();
    let bag = placed(0.0, 0.0).with(Prop::FLOAT_ATTRIBUTES, PropertyValue::FloatAttributes(channel));
    e.set_data(bag, Some(1));

    assert_eq!(e.dim3(), Vec3::new(1.0, 1.0, 2.5));
    assert!(e.has_dim_z());
}

#[test]
fn test_special_name() {
    let h = Harness::new();
    let mut e = h.entity(Space::PLAYER, 7);
    assert_eq!(e.special_name(), ("1:7".to_string(), "#FFFFFF".to_string()));

    let colors = [(IntAttribute::COLOR, 0x00FF_8800)].into_iter().collect();
    let bag = PropertyBag::new()
        .with(Prop::NAME, PropertyValue::Text("rook".into()))
        .with(Prop::INT_ATTRIBUTES, PropertyValue::IntAttributes(colors));
    e.set_data(bag, Some(1));
    assert_eq!(e.special_name(), ("rook".to_string(), "#FF8800".to_string()));
}

#[test]
fn test_bbox_with_buffer() {
    let h = Harness::new();
    let mut e = h.entity(Space::PLAYER, 1);
    let bag = PropertyBag::new().with(Prop::POS, vec2(0.0, 0.0)).with(Prop::DIM, vec2(2.0, 4.0));
    e.set_data(bag, Some(1));

    assert_eq!(e.bbox(0.0), Box2::new(Vec2::new(-1.0, -2.0), Vec2::new(1.0, 2.0)));
    assert_eq!(e.bbox(0.5), Box2::new(Vec2::new(-1.5, -2.5), Vec2::new(1.5, 2.5)));
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_initialize_twice_adds_once() {
    let h = Harness::new();
    let mut e = h.entity(Space::PLAYER, 1);
    e.set_data(placed(0.0, 0.0), Some(1));

    e.initialize().unwrap();
    e.initialize().unwrap();

    assert!(e.initialized());
    assert_eq!(h.bridge.lock().add_count(), 1);
}

#[test]
fn test_initialize_records_time_and_snapshot() {
    let h = Harness::new();
    h.clock.set(42);
    let mut e = h.entity(Space::PLAYER, 1);
    e.set_data(placed(2.0, 3.0), Some(4));
    e.initialize().unwrap();

    assert_eq!(e.initialize_time(), Some(42));
    let bridge = h.bridge.lock();
    assert_eq!(bridge.calls(), &[BridgeCall::Add(e.address(), placed(2.0, 3.0))]);
}

#[test]
fn test_snapshot_only_on_newer_sequence() {
    let h = Harness::new();
    let mut e = h.entity(Space::PLAYER, 1);
    e.set_data(placed(0.0, 0.0), Some(1));

    assert!(!e.snapshot_wasm().unwrap());
    e.initialize().unwrap();
    assert!(!e.snapshot_wasm().unwrap());

    e.set_data(placed(5.0, 5.0), Some(1));
    assert!(!e.snapshot_wasm().unwrap());

    e.set_data(PropertyBag::new().with(Prop::VEL, vec2(1.0, 0.0)), None);
    assert!(!e.snapshot_wasm().unwrap());

    e.set_data(placed(5.0, 5.0), Some(2));
    assert!(e.snapshot_wasm().unwrap());
    assert!(!e.snapshot_wasm().unwrap());

    assert_eq!(h.bridge.lock().set_data_count(), 1);
}

#[test]
fn test_failed_snapshot_is_retried() {
    let h = Harness::new();
    let mut e = h.entity(Space::PLAYER, 1);
    e.set_data(placed(0.0, 0.0), Some(1));
    e.initialize().unwrap();
    e.set_data(placed(1.0, 0.0), Some(2));

    h.bridge.lock().fail_next(BridgeError::Unavailable);
    assert_eq!(e.snapshot_wasm(), Err(BridgeError::Unavailable));
    assert!(e.snapshot_wasm().unwrap());
}

#[test]
fn test_failed_initialize_leaves_entity_uninitialized() {
    let h = Harness::new();
    let mut e = h.entity(Space::PLAYER, 1);
    e.set_data(placed(0.0, 0.0), Some(1));

    h.bridge.lock().fail_next(BridgeError::Unavailable);
    assert!(e.initialize().is_err());
    assert_eq!(e.lifecycle(), Lifecycle::Uninitialized);
    assert_eq!(e.initialize_time(), None);

    e.initialize().unwrap();
    assert!(e.initialized());
}

#[test]
fn test_delete_without_initialize_still_reaches_bridge() {
    let h = Harness::new();
    let mut e = h.entity(Space::PLAYER, 1);
    e.set_mesh(Mesh::new());

    e.delete().unwrap();
    e.delete().unwrap();

    assert!(e.deleted());
    assert!(!e.mesh().unwrap().is_attached());
    let bridge = h.bridge.lock();
    assert_eq!(bridge.calls(), &[BridgeCall::Delete(e.address())]);
    assert_eq!(bridge.add_count(), 0);
}

#[test]
fn test_local_write_alone_does_not_snapshot() {
    let h = Harness::new();
    let mut e = h.entity(Space::PLAYER, 1);
    e.set_data(placed(0.0, 0.0), Some(1));
    e.initialize().unwrap();

    assert_eq!(e.set_data(placed(7.0, 7.0), None), 2);
    assert_eq!(e.last_seq_num(), 1);
    assert!(!e.snapshot_wasm().unwrap());

    e.set_data(PropertyBag::new().with(Prop::VEL, vec2(1.0, 0.0)), Some(2));
    assert!(e.snapshot_wasm().unwrap());
    let bridge = h.bridge.lock();
    let BridgeCall::SetData(_, pushed) = &bridge.calls()[1] else {
        panic!("expected a snapshot push");
    };
    assert_eq!(pushed.get(Prop::POS), Some(&vec2(7.0, 7.0)));
}

#[test]
fn test_delete_is_idempotent() {
    let h = Harness::new();
    let mut e = h.entity(Space::PLAYER, 1);
    e.set_data(placed(0.0, 0.0), Some(1));
    e.initialize().unwrap();

    e.delete().unwrap();
    e.delete().unwrap();
    e.initialize().unwrap();

    let bridge = h.bridge.lock();
    assert_eq!(bridge.add_count(), 1);
    assert_eq!(bridge.delete_count(), 1);
    assert_eq!(e.lifecycle(), Lifecycle::Deleted);
}

#[test]
fn test_failed_delete_keeps_entity_alive() {
    let h = Harness::new();
    let mut e = h.entity(Space::PLAYER, 1);
    e.set_data(placed(0.0, 0.0), Some(1));
    e.initialize().unwrap();

    h.bridge.lock().fail_next(BridgeError::Unknown(e.address()));
    assert!(e.delete().is_err());
    assert!(e.initialized());

    e.delete().unwrap();
    assert_eq!(e.lifecycle(), Lifecycle::Deleted);
}

// ============================================================================
// Per-frame update
// ============================================================================

#[test]
fn test_update_moves_mesh_and_scales_timestep() {
    let h = Harness::new();
    let mut e = h.entity(Space::PLAYER, 1);
    e.set_data(placed(1.0, 2.0), Some(1));
    e.set_mesh(Mesh::new());
    assert_eq!(e.mesh().unwrap().name, "1:1");
    assert_eq!(e.mesh().unwrap().position, Vec3::new(1.0, 2.0, 0.0));

    e.set_data(placed(4.0, 5.0), Some(2));
    h.services.speed.set(2.0);
    h.clock.advance(100);
    e.update();

    assert_eq!(e.mesh().unwrap().position, Vec3::new(4.0, 5.0, 0.0));
    assert!((e.timestep() - 0.2).abs() < 1e-9);
}

#[test]
fn test_update_without_mesh_keeps_timestep() {
    let h = Harness::new();
    let mut e = h.entity(Space::PLAYER, 1);
    e.set_data(placed(1.0, 2.0), Some(1));

    h.clock.advance(100);
    e.update();
    assert!(e.timestep().abs() < f64::EPSILON);
}

#[test]
fn test_disabled_auto_update_leaves_mesh() {
    let h = Harness::new();
    let mut e = h.entity(Space::PLAYER, 1);
    e.set_data(placed(1.0, 2.0), Some(1));
    e.set_mesh(Mesh::new());
    e.disable_auto_update_pos();

    e.set_data(placed(9.0, 9.0), Some(2));
    e.update();
    assert_eq!(e.mesh().unwrap().position, Vec3::new(1.0, 2.0, 0.0));
}

// ============================================================================
// Kinds
// ============================================================================

#[test]
fn test_projectile_ready_needs_owner_and_dir() {
    let h = Harness::new();
    let mut e = h.entity(Space::PELLET, 1);
    e.set_data(placed(0.0, 0.0), Some(1));
    assert!(!e.ready());

    let owner = EntityAddress::new(Space::PLAYER, 3);
    e.set_data(PropertyBag::new().with(Prop::OWNER, PropertyValue::Address(owner)), Some(2));
    assert!(!e.ready());

    e.set_data(PropertyBag::new().with(Prop::DIR, vec2(0.0, 1.0)), Some(3));
    assert!(e.ready());
}

#[test]
fn test_projectile_fired_only_for_player_owner() {
    let h = Harness::new();
    let player = EntityAddress::new(Space::PLAYER, 3);

    let mut shot = h.entity(Space::ROCKET, 1);
    shot.set_data(aimed(player), Some(1));
    shot.initialize().unwrap();
    assert_eq!(shot.take_events(), vec![EntityEvent::Fired { projectile: shot.address(), owner: player }]);
    assert!(shot.take_events().is_empty());

    let mut turret_shot = h.entity(Space::ROCKET, 2);
    turret_shot.set_data(aimed(EntityAddress::new(Space::WALL, 3)), Some(1));
    turret_shot.initialize().unwrap();
    assert!(turret_shot.take_events().is_empty());
}

#[test]
fn test_projectile_flies_at_height_then_drops() {
    let h = Harness::new();
    let mut e = h.entity(Space::BOLT, 1);
    e.set_data(aimed(EntityAddress::new(Space::PLAYER, 1)), Some(1));
    e.set_mesh(Mesh::new());
    assert!(approx(e.mesh().unwrap().position.z, 0.5));

    h.clock.advance(100);
    e.update();
    assert!(approx(e.mesh().unwrap().position.z, 0.4));

    e.set_data(PropertyBag::new().with(Prop::VEL, vec2(0.0, 0.0)), Some(2));
    assert!(Projectile::stopped(&e));
    e.update();
    assert!(approx(e.mesh().unwrap().position.z, 0.0));
}

#[test]
fn test_hook_builds_its_own_mesh_and_spins() {
    let h = Harness::new();
    let mut e = h.entity(Space::GRAPPLING_HOOK, 1);
    e.set_data(aimed(EntityAddress::new(Space::PLAYER, 1)), Some(1));
    assert!(!e.has_mesh());

    e.initialize().unwrap();
    assert!(e.has_mesh());
    assert!(approx(e.mesh().unwrap().position.z, 0.5));

    h.clock.advance(100);
    e.update();
    let rotation = e.mesh().unwrap().rotation;
    assert!(approx(rotation.z, -1.5));
    assert!(approx(rotation.x, (-1.5f32).sin() * 0.05));
    assert!(approx(rotation.y, rotation.x));
}

#[test]
fn test_attached_hook_stops_spinning() {
    let h = Harness::new();
    let mut e = h.entity(Space::GRAPPLING_HOOK, 1);
    let channel = [(Attribute::ATTACHED, true)].into_iter().collect();
    let bag = aimed(EntityAddress::new(Space::PLAYER, 1))
        .with(Prop::ATTRIBUTES, PropertyValue::Attributes(channel));
    e.set_data(bag, Some(1));
    e.initialize().unwrap();

    h.clock.advance(100);
    e.update();
    assert_eq!(e.mesh().unwrap().rotation, Vec3::ZERO);
    assert!(approx(e.mesh().unwrap().position.z, 0.0));
}

#[test]
fn test_block_is_placed_once() {
    let h = Harness::new();
    let mut e = h.entity(Space::WALL, 1);
    e.set_data(PropertyBag::new().with(Prop::POS, vec2(2.0, 3.0)).with(Prop::DIM, vec2(2.0, 2.0)), Some(1));
    assert!(!e.ready());
    assert!(!e.auto_update_pos());

    let kinds = [(ByteAttribute::TYPE, 1)].into_iter().collect();
    e.set_data(PropertyBag::new().with(Prop::BYTE_ATTRIBUTES, PropertyValue::ByteAttributes(kinds)), Some(2));
    assert!(e.ready());

    e.set_mesh(Mesh::new());
    assert_eq!(e.mesh().unwrap().position, Vec3::new(2.0, 3.0, 0.0));

    e.set_data(PropertyBag::new().with(Prop::POS, vec2(8.0, 8.0)), Some(3));
    e.update();
    assert_eq!(e.mesh().unwrap().position, Vec3::new(2.0, 3.0, 0.0));

    let EntityKind::Block(block) = e.kind() else {
        panic!("wall should be a block");
    };
    assert!(block.contains(Vec2::new(2.5, 3.5)));
    assert!(!block.contains(Vec2::new(2.9, 3.0)));
}

#[test]
fn test_block_contains_entity() {
    let h = Harness::new();
    let mut wall = h.entity(Space::WALL, 1);
    wall.set_data(PropertyBag::new().with(Prop::POS, vec2(0.0, 0.0)).with(Prop::DIM, vec2(2.0, 2.0)), Some(1));
    wall.set_mesh(Mesh::new());

    let mut near = h.entity(Space::PLAYER, 1);
    near.set_data(placed(1.2, 0.0), Some(1));
    let mut far = h.entity(Space::PLAYER, 2);
    far.set_data(placed(5.0, 0.0), Some(1));

    let EntityKind::Block(block) = wall.kind() else {
        panic!("wall should be a block");
    };
    assert!(block.contains_entity(&near));
    assert!(!block.contains_entity(&far));
}
