//! Trains a fleet of A3C agents on a toy corridor task.
//!
//! Each session runs in its own thread and plays episodes against the service as a remote
//! client would: `create` for the first observation, `step` for the following ones and
//! `reset` at the end of every episode. The agent has to walk from the left end of the
//! corridor to the right end; an episode fails after `MAX_STEPS` steps.
use anyhow::Result;
use clap::Parser;
use crossbeam_channel::unbounded;
use lis::{build_service, A3cService, ServiceConfig};
use lis_a3c::{agent_stats_fmt, AgentPoolConfig, EpisodeSummary};
use lis_core::Observation;
use log::info;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::{sync::Arc, thread, time::Instant};

const CORRIDOR_LEN: usize = 8;
const MAX_STEPS: usize = 40;
const HIDDEN_DIM: usize = 32;
const STEP_PENALTY: f32 = -0.01;
const GOAL_REWARD: f32 = 1.0;
const REPORT_INTERVAL: usize = 50;

/// Corridor with the goal at the right end. Actions: 0 = left, 1 = stay, 2 = right.
struct Corridor {
    pos: usize,
    steps: usize,
    rng: SmallRng,
}

impl Corridor {
    fn new(seed: u64) -> Self {
        Self {
            pos: 0,
            steps: 0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    fn reset(&mut self) -> Observation {
        self.pos = self.rng.gen_range(0..CORRIDOR_LEN / 2);
        self.steps = 0;
        self.obs()
    }

    fn obs(&self) -> Observation {
        let mut v = vec![0f32; CORRIDOR_LEN];
        v[self.pos] = 1.0;
        Observation::new(v)
    }

    /// Returns the next observation, the reward and whether the goal was reached.
    fn step(&mut self, action: usize) -> (Observation, f32, bool) {
        self.steps += 1;
        match action {
            0 => self.pos = self.pos.saturating_sub(1),
            2 => self.pos = (self.pos + 1).min(CORRIDOR_LEN - 1),
            _ => {}
        }
        if self.pos == CORRIDOR_LEN - 1 {
            (self.obs(), GOAL_REWARD, true)
        } else {
            (self.obs(), STEP_PENALTY, false)
        }
    }
}

/// Result of an episode sent to the main thread.
struct EpisodeResult {
    session: String,
    success: bool,
    steps: usize,
}

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Number of concurrent sessions
    #[arg(long, default_value_t = 4)]
    sessions: usize,

    /// Number of agents in the pool
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Number of episodes per session
    #[arg(long, default_value_t = 200)]
    episodes: usize,

    /// Service configuration in YAML
    #[arg(long)]
    config: Option<String>,
}

fn play(
    service: &A3cService,
    session: &str,
    seed: u64,
    n_episodes: usize,
    sender: &crossbeam_channel::Sender<EpisodeResult>,
) -> Result<()> {
    let mut env = Corridor::new(seed);
    let mut obs = env.reset();

    // The action of the first contact decides whether the session is served at all.
    let mut action = match service.create(session, 0.0, &obs)? {
        Some(action) => action,
        None => return Ok(()),
    };

    for _ in 0..n_episodes {
        let start = Instant::now();
        let (success, reward) = loop {
            let (obs_, reward, done) = env.step(action);
            if done || env.steps >= MAX_STEPS {
                break (done, reward);
            }
            obs = obs_;
            action = match service.step(session, reward, &obs)? {
                Some(action) => action,
                None => return Ok(()),
            };
        };

        let summary = EpisodeSummary {
            success: success as u32,
            failure: !success as u32,
            elapsed: start.elapsed().as_secs_f32(),
            finished: true,
        };
        service.reset(session, reward, &summary)?;
        sender
            .send(EpisodeResult {
                session: session.to_string(),
                success,
                steps: env.steps,
            })
            .map_err(|_| anyhow::anyhow!("result receiver of {} disconnected", session))?;

        obs = env.reset();
        action = match service.step(session, 0.0, &obs)? {
            Some(action) => action,
            None => return Ok(()),
        };
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ServiceConfig::load(path)?,
        None => {
            let config = ServiceConfig::default();
            let model = config
                .model
                .clone()
                .obs_dim(CORRIDOR_LEN)
                .hidden_dim(HIDDEN_DIM);
            config.model(model)
        }
    }
    .pool(AgentPoolConfig::new(args.workers));
    info!("{:?}", config);

    let (service, global) = build_service(&config)?;
    let service = Arc::new(service);
    let (s, r) = unbounded();

    let handles: Vec<_> = (0..args.sessions)
        .map(|i| {
            let service = service.clone();
            let s = s.clone();
            let n_episodes = args.episodes;
            thread::spawn(move || play(&service, &format!("corridor-{}", i), i as u64, n_episodes, &s))
        })
        .collect();
    drop(s);

    let mut n_episodes = 0;
    let mut n_success = 0;
    let mut n_steps = 0;
    for result in r.iter() {
        n_episodes += 1;
        n_success += result.success as usize;
        n_steps += result.steps;
        if n_episodes % REPORT_INTERVAL == 0 {
            info!(
                "episodes = {}, success rate = {:.2}, mean steps = {:.1}, global version = {} (last: {})",
                n_episodes,
                n_success as f32 / REPORT_INTERVAL as f32,
                n_steps as f32 / REPORT_INTERVAL as f32,
                global.version(),
                result.session,
            );
            n_success = 0;
            n_steps = 0;
        }
    }

    for h in handles {
        if let Err(e) = h.join().map_err(|_| anyhow::anyhow!("session thread panicked"))? {
            log::error!("{}", e);
        }
    }

    let tally = service.tally();
    info!(
        "{} episodes, {} successes, {} failures",
        tally.episodes(),
        tally.success(),
        tally.failure()
    );
    info!("\n{}", agent_stats_fmt(&service.pool().stats()));
    Ok(())
}
