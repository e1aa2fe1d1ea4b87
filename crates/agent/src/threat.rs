//! Threat classification.
//!
//! Decides which perceived entity, if any, the agent should fight, and who
//! to blame when the agent or its protected target takes damage.

use guardfleet_config::AgentSettings;
use guardfleet_core::entity::{Entity, Vec3};
use guardfleet_core::roster::{BossList, TargetList};

/// Distance-based threat selection.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreatClassifier {
    /// Hostiles closer than this to the agent are threats
    pub agent_radius: f64,

    /// Hostiles closer than this to the protected target are threats
    pub guard_radius: f64,

    /// Blame radius around a damaged entity
    pub attacker_radius: f64,
}

impl Default for ThreatClassifier {
    fn default() -> Self {
        Self {
            agent_radius: 8.0,
            guard_radius: 16.0,
            attacker_radius: 5.0,
        }
    }
}

impl ThreatClassifier {
    pub fn from_settings(settings: &AgentSettings) -> Self {
        Self {
            agent_radius: settings.agent_radius,
            guard_radius: settings.guard_radius,
            attacker_radius: settings.attacker_radius,
        }
    }

    /// Hostile mobs and anyone on the target list.
    pub fn is_hostile(&self, entity: &Entity, targets: &TargetList) -> bool {
        entity.is_hostile_mob() || targets.contains(&entity.name)
    }

    /// First hostile entity, in perception order, that is close to the agent
    /// or close to the protected target.
    ///
    /// `protected` is the protected target's live position; `None` when there
    /// is no protected target or it is out of view.
    pub fn find_threat(
        &self,
        agent: Vec3,
        protected: Option<Vec3>,
        entities: &[Entity],
        targets: &TargetList,
    ) -> Option<Entity> {
        entities
            .iter()
            .filter(|e| self.is_hostile(e, targets))
            .find(|e| {
                if e.distance_to(&agent) < self.agent_radius {
                    return true;
                }
                protected.is_some_and(|p| e.distance_to(&p) < self.guard_radius)
            })
            .cloned()
    }

    /// Nearest entity within the blame radius of `from` that is neither a
    /// boss nor one of `spared` (the victim, the agent, its protected target).
    pub fn find_attacker(
        &self,
        from: Vec3,
        entities: &[Entity],
        bosses: &BossList,
        spared: &[&str],
    ) -> Option<Entity> {
        entities
            .iter()
            .filter(|e| !bosses.contains(&e.name))
            .filter(|e| !spared.contains(&e.name.as_str()))
            .map(|e| (e.distance_to(&from), e))
            .filter(|(d, _)| *d < self.attacker_radius)
            .min_by(|(a, _), (b, _)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(_, e)| e.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guardfleet_core::entity::EntityKind;

    fn at(name: &str, kind: EntityKind, x: f64) -> Entity {
        Entity::new(name.len() as u32, name, kind, Vec3::new(x, 0.0, 0.0))
    }

    #[test]
    fn listed_player_near_agent_is_threat_without_protected_target() {
        let classifier = ThreatClassifier::default();
        let targets = TargetList::seeded(["Mallory"]);
        let entities = vec![at("Mallory", EntityKind::Player, 7.9)];

        let threat = classifier.find_threat(Vec3::default(), None, &entities, &targets);
        assert_eq!(threat.unwrap().name, "Mallory");
    }

    #[test]
    fn unlisted_player_is_never_a_threat() {
        let classifier = ThreatClassifier::default();
        let entities = vec![at("Bob", EntityKind::Player, 1.0)];

        let threat = classifier.find_threat(
            Vec3::default(),
            Some(Vec3::default()),
            &entities,
            &TargetList::new(),
        );
        assert!(threat.is_none());
    }

    #[test]
    fn hostile_near_protected_target_is_threat() {
        // Zombie1 is 20 from the agent but 10 from Alice.
        let classifier = ThreatClassifier::default();
        let alice = Vec3::new(10.0, 0.0, 0.0);
        let entities = vec![
            at("Alice", EntityKind::Player, 10.0),
            at("Zombie1", EntityKind::HostileMob, 20.0),
        ];

        let threat =
            classifier.find_threat(Vec3::default(), Some(alice), &entities, &TargetList::new());
        assert_eq!(threat.unwrap().name, "Zombie1");

        let unguarded =
            classifier.find_threat(Vec3::default(), None, &entities, &TargetList::new());
        assert!(unguarded.is_none());
    }

    #[test]
    fn boundaries_are_exclusive() {
        let classifier = ThreatClassifier::default();
        let entities = vec![at("Skeleton", EntityKind::HostileMob, 8.0)];
        assert!(
            classifier
                .find_threat(Vec3::default(), None, &entities, &TargetList::new())
                .is_none()
        );
    }

    #[test]
    fn first_match_in_perception_order_wins() {
        let classifier = ThreatClassifier::default();
        let entities = vec![
            at("Spider", EntityKind::HostileMob, 6.0),
            at("Creeper", EntityKind::HostileMob, 2.0),
        ];
        let threat = classifier.find_threat(Vec3::default(), None, &entities, &TargetList::new());
        assert_eq!(threat.unwrap().name, "Spider");
    }

    #[test]
    fn attacker_is_never_a_boss() {
        let classifier = ThreatClassifier::default();
        let bosses = BossList::new(["Alice"]);
        let entities = vec![
            at("Alice", EntityKind::Player, 0.5),
            at("Mallory", EntityKind::Player, 3.0),
        ];

        let attacker = classifier.find_attacker(Vec3::default(), &entities, &bosses, &[]);
        assert_eq!(attacker.unwrap().name, "Mallory");

        let only_boss = vec![at("Alice", EntityKind::Player, 0.5)];
        assert!(
            classifier
                .find_attacker(Vec3::default(), &only_boss, &bosses, &[])
                .is_none()
        );
    }

    #[test]
    fn attacker_is_nearest_to_victim() {
        let classifier = ThreatClassifier::default();
        let victim = Vec3::new(10.0, 0.0, 0.0);
        let entities = vec![
            at("Trudy", EntityKind::Player, 6.0),
            at("Mallory", EntityKind::Player, 11.0),
        ];
        let attacker = classifier.find_attacker(victim, &entities, &BossList::default(), &[]);
        assert_eq!(attacker.unwrap().name, "Mallory");
    }

    #[test]
    fn victim_is_not_its_own_attacker() {
        // Bob is guarded but not a boss; he sits at distance 0 from himself.
        let classifier = ThreatClassifier::default();
        let victim = Vec3::new(10.0, 0.0, 0.0);
        let entities = vec![
            at("Bob", EntityKind::Player, 10.0),
            at("Mallory", EntityKind::Player, 12.0),
        ];

        let attacker =
            classifier.find_attacker(victim, &entities, &BossList::default(), &["Bob"]);
        assert_eq!(attacker.unwrap().name, "Mallory");

        let alone = vec![at("Bob", EntityKind::Player, 10.0)];
        assert!(
            classifier
                .find_attacker(victim, &alone, &BossList::default(), &["Bob"])
                .is_none()
        );
    }
}
