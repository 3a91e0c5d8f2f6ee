use rand::Rng;
use smallvec::SmallVec;

use crate::game::constants::evasion::*;
use crate::game::constants::threat::DANGER_RADIUS;
use crate::game::state::AgentBody;
use crate::game::systems::threat::ThreatRecord;
use crate::game::view::WorldView;
use crate::util::vec2::Vec2;

/// One candidate dodge direction
#[derive(Debug, Clone, Copy)]
struct Candidate {
    direction: Vec2,
    perpendicular: bool,
}

/// Pick a dodge direction against `threats` (sorted, most dangerous first)
///
/// `focus` is the point the agent is fighting over, if any. Returns `None` only
/// when there is nothing to dodge; when every candidate is blocked or scores too
/// low, a random perpendicular is returned instead.
pub fn choose_dodge_direction<R: Rng>(
    view: &WorldView,
    agent: &AgentBody,
    focus: Option<Vec2>,
    threats: &[ThreatRecord],
    rng: &mut R,
) -> Option<Vec2> {
    let primary = threats.first()?;
    let travel = primary.direction;
    let left = travel.perpendicular();
    let right = -left;

    let candidates: SmallVec<[Candidate; 5]> = [
        (left, true),
        (right, true),
        ((left - travel).normalize(), false),
        ((right - travel).normalize(), false),
        (-travel, false),
    ]
    .into_iter()
    .map(|(direction, perpendicular)| Candidate {
        direction,
        perpendicular,
    })
    .collect();

    let distance = evaluation_distance(primary.time_to_impact);

    let best = candidates
        .iter()
        .filter_map(|c| {
            let landing = agent.position + c.direction * distance;
            let footprint = agent.bounds_at(landing);
            if !view.world.bounds.contains_box(&footprint) || view.overlaps_obstacle(&footprint) {
                return None;
            }
            Some((c.direction, score_landing(agent.position, landing, c.perpendicular, focus, threats)))
        })
        .max_by(|a, b| a.1.total_cmp(&b.1));

    match best {
        Some((direction, score)) if score >= MIN_ACCEPTABLE_SCORE => Some(direction),
        _ => Some(if rng.gen_bool(0.5) { left } else { right }),
    }
}

/// Lookahead used to evaluate candidates; not the distance actually travelled
pub fn evaluation_distance(time_to_impact: f32) -> f32 {
    if time_to_impact < URGENT_TIME {
        URGENT_DODGE_DISTANCE
    } else {
        DODGE_DISTANCE
    }
}

/// Dodge speed multiplier by urgency
pub fn dodge_speed_multiplier(time_to_impact: f32) -> f32 {
    if time_to_impact < URGENT_TIME {
        MULTIPLIER_URGENT
    } else if time_to_impact < SOON_TIME {
        MULTIPLIER_SOON
    } else {
        MULTIPLIER_DEFAULT
    }
}

fn score_landing(
    origin: Vec2,
    landing: Vec2,
    perpendicular: bool,
    focus: Option<Vec2>,
    threats: &[ThreatRecord],
) -> f32 {
    let mut score = BASE_SCORE;
    if perpendicular {
        score += PERPENDICULAR_BONUS;
    }

    let path_band = DANGER_RADIUS * 2.0;
    for threat in threats {
        let offset = landing - threat.position;

        // Still ahead of the projectile: penalize by closeness to its line
        let along = offset.dot(threat.direction);
        if along > 0.0 {
            let off_line = offset.cross(threat.direction).abs();
            if off_line < path_band {
                score -= PATH_PENALTY * (1.0 - off_line / path_band);
            }
        }

        let gap = offset.length();
        if gap < PROJECTILE_CLEARANCE {
            score -= (PROJECTILE_CLEARANCE - gap) * PROJECTILE_PENALTY_PER_UNIT;
        }
    }

    if let Some(focus) = focus {
        if focus.distance_to(origin) < FOCUS_NEAR_DISTANCE && landing.distance_to(focus) < FOCUS_CLEARANCE {
            score -= FOCUS_PENALTY;
        }
    }

    score
}
