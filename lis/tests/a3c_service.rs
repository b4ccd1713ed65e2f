use anyhow::Result;
use lis::{build_service, ServiceConfig};
use lis_a3c::{AgentCoreConfig, AgentPoolConfig, EpisodeSummary};
use lis_candle_agent::LstmActorCriticConfig;
use lis_core::Observation;
use std::{sync::Arc, thread};
use tempdir::TempDir;
use test_log::test;

const OBS_DIM: usize = 4;

fn config(n_workers: usize) -> ServiceConfig {
    ServiceConfig::default()
        .pool(AgentPoolConfig::new(n_workers))
        .agent(AgentCoreConfig::default().rollout_len(4))
        .model(
            LstmActorCriticConfig::default()
                .obs_dim(OBS_DIM)
                .hidden_dim(8),
        )
}

fn obs(t: usize) -> Observation {
    Observation::new((0..OBS_DIM).map(|i| ((t + i) % 3) as f32).collect())
}

#[test]
fn test_sessions_update_shared_global_model() -> Result<()> {
    let (service, global) = build_service(&config(2))?;
    let service = Arc::new(service);

    let handles: Vec<_> = ["a", "b"]
        .iter()
        .map(|&session| {
            let service = service.clone();
            thread::spawn(move || -> Result<()> {
                service.create(session, 0.0, &obs(0))?;
                for t in 1..10 {
                    let action = service.step(session, 0.1 * t as f32, &obs(t))?;
                    assert!(matches!(action, Some(a) if a < 3));
                }
                service.reset(session, 1.0, &EpisodeSummary::default())?;
                Ok(())
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap()?;
    }

    // 10 transitions per session: 4 + 4 + 2 (terminal).
    let stats = service.pool().stats();
    assert!(stats.iter().all(|s| s.train_steps + s.skipped_train_steps == 3));
    assert_eq!(
        global.version() as usize,
        stats.iter().map(|s| s.train_steps).sum::<usize>()
    );

    // A third session is not served.
    assert_eq!(service.create("c", 0.0, &obs(0))?, None);
    Ok(())
}

#[test]
fn test_checkpoint_of_global_model() -> Result<()> {
    let (service, global) = build_service(&config(1))?;
    service.create("a", 0.0, &obs(0))?;
    for t in 1..6 {
        service.step("a", 1.0, &obs(t))?;
    }

    let dir = TempDir::new("a3c_service")?;
    let path = dir.path().join("global.safetensors");
    global.save(&path)?;

    let (_, global_) = build_service(&config(1))?;
    global_.load(&path)?;
    for ((_, v1), (_, v2)) in global.vars().iter().zip(global_.vars().iter()) {
        assert_eq!(
            v1.as_tensor().flatten_all()?.to_vec1::<f32>()?,
            v2.as_tensor().flatten_all()?.to_vec1::<f32>()?
        );
    }
    Ok(())
}
