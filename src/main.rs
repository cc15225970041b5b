//! Kinema - Main Entry Point
//!
//! Runs a scripted headless session in the test arena and logs what the
//! agents do. Set `RUST_LOG=debug` to see controller corrections.

use kinema_game::{AgentInput, Simulation};

/// One scripted segment: hold an input for a number of ticks.
struct Segment {
    label: &'static str,
    ticks: u32,
    input: AgentInput,
}

fn script() -> Vec<Segment> {
    let mut forward = AgentInput::default();
    forward.movement.forward = true;

    let mut diagonal = AgentInput::default();
    diagonal.movement.forward = true;
    diagonal.movement.right = true;

    let mut jump = forward.clone();
    jump.jump = true;

    let mut back = AgentInput::default();
    back.movement.backward = true;

    vec![
        Segment {
            label: "settle",
            ticks: 30,
            input: AgentInput::default(),
        },
        Segment {
            label: "run forward",
            ticks: 90,
            input: forward,
        },
        Segment {
            label: "jump",
            ticks: 1,
            input: jump,
        },
        Segment {
            label: "run diagonal",
            ticks: 120,
            input: diagonal,
        },
        Segment {
            label: "back up",
            ticks: 60,
            input: back,
        },
    ]
}

fn main() {
    env_logger::init();

    let mut sim = Simulation::test();
    for name in ["Runner", "Follower"] {
        if let Err(err) = sim.add_agent(name) {
            log::error!("could not add {}: {}", name, err);
            return;
        }
    }

    log::info!(
        "level '{}' with {} volumes at {} Hz",
        sim.level.name,
        sim.level.collision.volume_count(),
        sim.config.tick_rate
    );

    for segment in script() {
        log::info!("-- {} ({} ticks)", segment.label, segment.ticks);

        let inputs = vec![segment.input; sim.agents.len()];
        for _ in 0..segment.ticks {
            sim.tick(&inputs);
        }

        for agent in &sim.agents {
            let contacts = agent.controller().contacts();
            log::info!(
                "frame {:>4} agent {} at ({:.3}, {:.3}, {:.3}) grounded={} wall={} ceiling={}",
                sim.frame,
                agent.name,
                agent.position().x,
                agent.position().y,
                agent.position().z,
                agent.on_ground(),
                contacts.hit_wall(),
                contacts.hit_ceiling()
            );
        }
    }

    let deaths: u32 = sim.agents.iter().map(|a| a.deaths).sum();
    log::info!("finished after {} frames, {} deaths", sim.frame, deaths);
}
