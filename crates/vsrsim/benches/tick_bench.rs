use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use vsrsim_agents::{ControllerSpec, GridBody, GridShape, NumGridVsr, SensorKind};
use vsrsim_core::{Action, ActionPerformer, Engine, EngineConfig, KinematicEngine, Material};
use vsrsim_geometry::Terrain;

fn engine_with_biped(width: usize, height: usize) -> KinematicEngine {
    let mut engine = KinematicEngine::new(EngineConfig::default());
    let terrain = Terrain::flat(200.0, 0.0, 10.0, 20.0);
    engine
        .perform(
            &Action::CreateUnmovableBody {
                poly: terrain.poly().clone(),
            },
            None,
        )
        .unwrap();
    let body = GridBody::from_shape(
        GridShape::Biped { width, height },
        Material::default(),
        &[SensorKind::AreaRatio, SensorKind::Contact, SensorKind::VELOCITY_X],
    )
    .unwrap();
    let brain = ControllerSpec::default().build(
        NumGridVsr::n_of_inputs(&body),
        NumGridVsr::n_of_outputs(&body),
        0xBEEF,
    );
    let id = engine.register_agent(Box::new(NumGridVsr::new(body, brain).unwrap()));
    engine.perform(&Action::AddAgent { agent: id }, None).unwrap();
    engine
        .perform(
            &Action::TranslateAgent {
                agent: id,
                translation: vsrsim_geometry::Point::new(20.0, 0.25),
            },
            None,
        )
        .unwrap();
    engine
}

fn bench_ticks(c: &mut Criterion) {
    let mut group = c.benchmark_group("kinematic_tick");
    let steps: usize = std::env::var("VSRSIM_BENCH_STEPS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(60);
    for (width, height) in [(4, 3), (8, 5), (16, 8)] {
        group.bench_function(format!("biped{}x{}_steps{}", width, height, steps), |b| {
            b.iter_batched(
                || engine_with_biped(width, height),
                |mut engine| {
                    for _ in 0..steps {
                        engine.tick().unwrap();
                    }
                    engine
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ticks);
criterion_main!(benches);
