//! Game simulation - the fixed-tick loop.
//!
//! Agents are updated in insertion order with a fixed timestep, so the same
//! inputs always reproduce the same positions.

use glam::Vec3;
use kinema_physics::{ConfigError, ControllerConfig};
use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentStats, EntityId};
use crate::input::AgentInput;
use crate::level::Level;

/// Game simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Simulation tick rate (ticks per second).
    pub tick_rate: u32,

    /// Controller configuration for new agents.
    pub controller: ControllerConfig,

    /// Movement tuning for new agents.
    pub stats: AgentStats,

    /// Agents whose position falls below this height are removed.
    pub kill_plane_y: f32,

    /// Seconds a removed agent waits before respawning.
    pub respawn_delay: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            controller: ControllerConfig::default(),
            stats: AgentStats::default(),
            kill_plane_y: -20.0,
            respawn_delay: 1.0,
        }
    }
}

impl SimulationConfig {
    /// Get the time step per tick in seconds.
    pub fn delta_time(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }
}

/// The main game simulation.
#[derive(Debug)]
pub struct Simulation {
    /// Current frame/tick number.
    pub frame: u64,

    /// Simulation configuration.
    pub config: SimulationConfig,

    /// Current level.
    pub level: Level,

    /// All agents in the game.
    pub agents: Vec<Agent>,

    /// Next entity ID to assign.
    next_entity_id: EntityId,
}

impl Simulation {
    /// Create a new simulation with the given configuration and level.
    pub fn new(config: SimulationConfig, level: Level) -> Self {
        Self {
            frame: 0,
            config,
            level,
            agents: Vec::new(),
            next_entity_id: 1,
        }
    }

    /// Create a simulation with default configuration and test arena.
    pub fn test() -> Self {
        Self::new(SimulationConfig::default(), Level::test_arena())
    }

    /// Add an agent at the next spawn point.
    ///
    /// Returns the agent's ID, or the configuration error that prevented
    /// building its controller.
    pub fn add_agent(&mut self, name: &str) -> Result<EntityId, ConfigError> {
        let (position, facing) = self.spawn_for(self.agents.len());

        let agent = Agent::new(
            self.next_entity_id,
            name.to_string(),
            self.level.collision.clone(),
            self.config.controller.clone(),
            self.config.stats.clone(),
            position,
            facing,
        )?;

        let id = agent.id;
        self.next_entity_id += 1;
        log::info!("agent {} ({}) joined at {:?}", id, name, position);

        self.agents.push(agent);
        Ok(id)
    }

    /// Remove an agent from the simulation.
    pub fn remove_agent(&mut self, agent_id: EntityId) {
        self.agents.retain(|a| a.id != agent_id);
    }

    /// Get an agent by ID.
    pub fn get_agent(&self, agent_id: EntityId) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == agent_id)
    }

    /// Get a mutable reference to an agent by ID.
    pub fn get_agent_mut(&mut self, agent_id: EntityId) -> Option<&mut Agent> {
        self.agents.iter_mut().find(|a| a.id == agent_id)
    }

    /// Advance the simulation by one tick.
    ///
    /// # Arguments
    ///
    /// * `inputs` - Agent inputs indexed by agent position in the `agents` array
    pub fn tick(&mut self, inputs: &[AgentInput]) {
        let delta_time = self.config.delta_time();
        let kill_plane_y = self.config.kill_plane_y;
        let respawn_delay = self.config.respawn_delay;

        for i in 0..self.agents.len() {
            if self.agents[i].tick_respawn(delta_time, respawn_delay) {
                let (position, facing) = self.spawn_for(i);
                self.agents[i].respawn(position, facing);
                continue;
            }

            // Get input for this agent (default if not provided)
            let input = inputs.get(i).cloned().unwrap_or_default();
            let agent = &mut self.agents[i];
            agent.update(&input, delta_time);

            if agent.is_alive() && agent.position().y < kill_plane_y {
                agent.kill();
            }
        }

        // Check triggers for all agents
        for agent in &self.agents {
            if agent.is_alive() {
                let radius = agent.controller().radius();
                for trigger_id in self.level.check_triggers(agent.position(), radius) {
                    log::info!("agent {} triggered: {}", agent.id, trigger_id);
                }
            }
        }

        self.frame += 1;
    }

    /// Get the delta time for this simulation.
    pub fn delta_time(&self) -> f32 {
        self.config.delta_time()
    }

    fn spawn_for(&self, index: usize) -> (Vec3, f32) {
        self.level
            .spawn_point(index)
            .map_or((Vec3::ZERO, 0.0), |s| (s.position, s.facing))
    }
}

// ============================================================================
// Tests
// ============================================================================
