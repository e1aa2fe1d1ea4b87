//! Engagement strategy: ranged or melee.
//!
//! For a selected enemy the strategist estimates how long the enemy needs to
//! reach the agent. If the agent can shoot and the enemy is further away than
//! the bow draw time, it shoots; otherwise it closes in and strikes.

use guardfleet_config::AgentSettings;
use guardfleet_core::entity::{Entity, Vec3};
use guardfleet_core::error::{EngagementError, WorldError};
use guardfleet_core::world::{Goal, MovementProfile, PathStatus, World};
use tracing::debug;

/// Converts path cost into seconds of travel.
///
/// Path cost is roughly "blocks walked, weighted by terrain", so dividing by
/// a speed in cost-units per second gives a time. The speed is a tunable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TravelModel {
    pub speed: f64,
}

impl Default for TravelModel {
    fn default() -> Self {
        Self { speed: 1.0 }
    }
}

impl TravelModel {
    pub fn seconds(&self, cost: f64) -> f64 {
        cost / self.speed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Ranged,
    Melee,
}

/// One attack attempt. Lives only for the duration of the attack.
#[derive(Debug, Clone, PartialEq)]
pub struct EngagementTask {
    pub target: Entity,
    pub modality: Modality,
    /// Seconds until the target reaches the agent
    pub arrival_estimate: f64,
}

#[derive(Debug, Clone)]
pub struct EngagementStrategist {
    /// Goal radius around the agent used for the arrival estimate
    pub approach_range: f64,
    /// How close to get before striking
    pub melee_range: f64,
    /// Seconds needed to draw the bow
    pub draw_time: f64,
    pub travel: TravelModel,
    pub profile: MovementProfile,
}

impl Default for EngagementStrategist {
    fn default() -> Self {
        Self {
            approach_range: 4.0,
            melee_range: 6.0,
            draw_time: 4.0,
            travel: TravelModel::default(),
            profile: MovementProfile::default(),
        }
    }
}

impl EngagementStrategist {
    pub fn from_settings(settings: &AgentSettings) -> Self {
        Self {
            approach_range: settings.approach_range,
            melee_range: settings.melee_range,
            draw_time: settings.draw_time,
            travel: TravelModel {
                speed: settings.speed,
            },
            profile: MovementProfile::default(),
        }
    }

    /// Seconds for `enemy` to come within `approach_range` of `agent`.
    ///
    /// Partial search results are pulled until the search completes.
    pub fn estimate_arrival(
        &self,
        world: &dyn World,
        agent: Vec3,
        enemy: &Entity,
    ) -> Result<f64, EngagementError> {
        let goal = Goal::Near {
            position: agent,
            range: self.approach_range,
        };
        let no_route = || EngagementError::NoRoute {
            target: enemy.name.clone(),
        };

        for segment in world.find_path(&self.profile, enemy.position, &goal) {
            match segment.status {
                PathStatus::Partial => continue,
                PathStatus::Success => return Ok(self.travel.seconds(segment.cost)),
                PathStatus::NoPath => return Err(no_route()),
            }
        }
        Err(no_route())
    }

    /// Choose a modality for `enemy`.
    pub fn plan(
        &self,
        world: &dyn World,
        agent: Vec3,
        enemy: &Entity,
    ) -> Result<EngagementTask, EngagementError> {
        let arrival_estimate = self.estimate_arrival(world, agent, enemy)?;
        let modality = if world.can_shoot() && arrival_estimate > self.draw_time {
            Modality::Ranged
        } else {
            Modality::Melee
        };

        Ok(EngagementTask {
            target: enemy.clone(),
            modality,
            arrival_estimate,
        })
    }

    /// Carry out a planned attack.
    pub async fn execute(
        &self,
        world: &dyn World,
        task: &EngagementTask,
    ) -> Result<(), EngagementError> {
        debug!(
            target = %task.target.name,
            modality = ?task.modality,
            eta = task.arrival_estimate,
            "Engaging"
        );

        match task.modality {
            Modality::Ranged => world.shoot(&task.target).await?,
            Modality::Melee => {
                world
                    .move_to(Goal::Follow {
                        entity: task.target.clone(),
                        range: self.melee_range,
                    })
                    .await?;
                world.equip_melee().await?;
                world.strike(&task.target).await?;
            }
        }
        Ok(())
    }

    /// Plan and execute one attack against `enemy`.
    pub async fn attack(
        &self,
        world: &dyn World,
        enemy: &Entity,
    ) -> Result<EngagementTask, EngagementError> {
        let me = world.self_entity().ok_or(WorldError::NotSpawned)?;
        let task = self.plan(world, me.position, enemy)?;
        self.execute(world, &task).await?;
        Ok(task)
    }
}
