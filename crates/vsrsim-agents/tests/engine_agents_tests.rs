//! Voxel robots assembled and run inside the kinematic engine

use vsrsim_agents::{
    Constant, ControllerSpec, GridBody, GridShape, NumGridVsr, NumSelfAssemblyVsr,
    SelfAssemblyConfig, SensorKind,
};
use vsrsim_core::{
    Action, ActionPerformer, Engine, EngineConfig, KinematicEngine, LinkType, Material, Side,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn worm(length: usize) -> NumGridVsr {
    let body = GridBody::from_shape(
        GridShape::Worm { length },
        Material::default(),
        &[SensorKind::AreaRatio, SensorKind::Contact],
    )
    .unwrap();
    let controller = Constant::new(NumGridVsr::n_of_inputs(&body), vec![0.5; length]);
    NumGridVsr::new(body, Box::new(controller)).unwrap()
}

// ============================================================================
// Grid robots
// ============================================================================

#[test]
fn test_grid_worm_is_rigidly_linked() {
    init_logging();
    let mut engine = KinematicEngine::new(EngineConfig::default());
    let id = engine.register_agent(Box::new(worm(3)));
    engine.perform(&Action::AddAgent { agent: id }, None).unwrap();

    assert_eq!(engine.agent_bodies(id).map(|b| b.len()), Some(3));
    let links = engine.world().links();
    assert_eq!(links.len(), 4);
    assert!(links.iter().all(|l| l.kind == LinkType::Rigid));
    assert_eq!(engine.world_state().assemblies().len(), 1);
}

#[test]
fn test_grid_worm_senses_and_actuates_each_tick() {
    init_logging();
    let mut engine = KinematicEngine::new(EngineConfig::default());
    let id = engine.register_agent(Box::new(worm(2)));
    engine.perform(&Action::AddAgent { agent: id }, None).unwrap();

    let first = engine.tick().unwrap();
    let second = engine.tick().unwrap();
    // 2 voxels x 2 sensors, then 2 actuations
    assert_eq!(first.action_outcomes.len(), 6);
    assert!(first.action_outcomes.iter().all(|o| o.is_success()));
    let ios = &second.agent(id).unwrap().brain_ios;
    assert_eq!(ios.len(), 1);
    assert_eq!(ios[0].inputs.values.len(), 4);
    assert_eq!(ios[0].outputs.values, vec![0.5, 0.5]);
}

// ============================================================================
// Self-assembly
// ============================================================================

#[test]
fn test_touching_units_attach_to_each_other() {
    init_logging();
    let config = SelfAssemblyConfig {
        units: 2,
        unit_spacing: 0.0,
        controller: ControllerSpec::Constant { value: 0.5 },
        ..SelfAssemblyConfig::default()
    };
    let agent = NumSelfAssemblyVsr::from_config(config, 1).unwrap();
    let mut engine = KinematicEngine::new(EngineConfig::default());
    let id = engine.register_agent(Box::new(agent));
    engine.perform(&Action::AddAgent { agent: id }, None).unwrap();
    assert!(engine.world().links().is_empty());

    engine.tick().unwrap();

    let links = engine.world().links();
    assert!(!links.is_empty());
    assert!(links
        .iter()
        .all(|l| l.kind == LinkType::Soft && l.source.body != l.target.body));
    assert_eq!(engine.world_state().assemblies().len(), 1);
}

#[test]
fn test_detaching_units_split_apart() {
    init_logging();
    let config = SelfAssemblyConfig {
        units: 2,
        unit_spacing: 0.0,
        controller: ControllerSpec::Constant { value: -0.5 },
        ..SelfAssemblyConfig::default()
    };
    let agent = NumSelfAssemblyVsr::from_config(config, 1).unwrap();
    let mut engine = KinematicEngine::new(EngineConfig::default());
    let id = engine.register_agent(Box::new(agent));
    engine.perform(&Action::AddAgent { agent: id }, None).unwrap();
    let bodies = engine.agent_bodies(id).unwrap();
    engine
        .perform(
            &Action::CreateLink {
                source: vsrsim_core::AnchorId::new(bodies[0], 1),
                target: vsrsim_core::AnchorId::new(bodies[1], 0),
                kind: LinkType::Soft,
            },
            None,
        )
        .unwrap();
    assert_eq!(engine.world().links().len(), 1);

    engine.tick().unwrap();

    assert!(engine.world().links().is_empty());
    assert_eq!(engine.world_state().assemblies().len(), 2);
}

#[test]
fn test_signal_reaches_neighbour_on_facing_side() {
    init_logging();
    let config = SelfAssemblyConfig {
        units: 2,
        controller: ControllerSpec::Constant { value: 0.2 },
        ..SelfAssemblyConfig::default()
    };
    let io = config.io();
    let agent = NumSelfAssemblyVsr::from_config(config, 1).unwrap();
    let mut engine = KinematicEngine::new(EngineConfig::default());
    let id = engine.register_agent(Box::new(agent));
    engine.perform(&Action::AddAgent { agent: id }, None).unwrap();

    let mut last = None;
    for _ in 0..4 {
        last = Some(engine.tick().unwrap());
    }
    let snapshot = last.unwrap();
    let ios = &snapshot.agent(id).unwrap().brain_ios;
    let left = &ios[0].inputs.values;
    let right = &ios[1].inputs.values;

    // 0.2 stays inside the attach deadband, so the units only talk
    assert!(engine.world().links().is_empty());
    assert!((left[io.nfc_input_index(Side::E, 0)] - 0.2).abs() < 1e-9);
    assert!((right[io.nfc_input_index(Side::W, 0)] - 0.2).abs() < 1e-9);
    for side in [Side::N, Side::S, Side::W] {
        assert_eq!(left[io.nfc_input_index(side, 0)], 0.0);
    }
    assert_eq!(right[io.nfc_input_index(Side::E, 0)], 0.0);
}

#[test]
fn test_self_assembly_config_reads_from_ron() {
    init_logging();
    let config: SelfAssemblyConfig =
        ron::from_str("(units: 3, n_signals: 2, controller: constant(value: 0.1))").unwrap();
    assert_eq!(config.units, 3);
    assert_eq!(config.io().n_of_inputs(), 6 + 8);
    assert_eq!(config.unit_spacing, SelfAssemblyConfig::default().unit_spacing);
}
